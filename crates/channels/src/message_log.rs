use async_trait::async_trait;

use crate::Result;

/// A single line of a room log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLogEntry {
    /// Sanitized room key, also the log file stem (e.g. `matrix_abcexample.org`).
    pub room: String,
    pub body: String,
    /// Whether the bot's own account sent the message.
    pub from_self: bool,
}

impl MessageLogEntry {
    pub fn new(room: impl Into<String>, body: impl Into<String>, from_self: bool) -> Self {
        Self {
            room: room.into(),
            body: body.into(),
            from_self,
        }
    }
}

/// Append-only per-room log of every observed message.
#[async_trait]
pub trait MessageLog: Send + Sync {
    async fn append(&self, entry: MessageLogEntry) -> Result<()>;
    /// Room keys that have a log.
    fn list_rooms(&self) -> Vec<String>;
}
