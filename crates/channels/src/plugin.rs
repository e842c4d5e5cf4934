use {anyhow::Result, async_trait::async_trait};

// ── Message model ───────────────────────────────────────────────────────────

/// Messaging platforms with a channel plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Matrix,
}

impl ChannelType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Matrix => "matrix",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse message kind. Only text and notices carry chat content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMessageKind {
    Text,
    Notice,
    /// Images, files, emotes, and anything else.
    Other,
}

impl ChannelMessageKind {
    pub fn is_textual(self) -> bool {
        matches!(self, Self::Text | Self::Notice)
    }
}

/// A message observed in a room, normalized by the channel plugin.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InboundMessage {
    pub channel_type: ChannelType,
    pub account_id: String,
    /// Room the message was posted in.
    pub chat_id: String,
    pub message_id: Option<String>,
    pub sender: String,
    pub kind: ChannelMessageKind,
    pub body: String,
    /// Sent by the bot's own account (possibly from another device).
    pub from_self: bool,
    /// The room has end-to-end encryption enabled.
    pub encrypted: bool,
}

// ── Traits ──────────────────────────────────────────────────────────────────

/// Sink for inbound channel messages. The reply pipeline provides the
/// concrete implementation.
#[async_trait]
pub trait ChannelEventSink: Send + Sync {
    /// Process one inbound message. Any reply goes out through `outbound`.
    async fn dispatch_inbound(
        &self,
        msg: &InboundMessage,
        outbound: &dyn ChannelOutbound,
    ) -> Result<()>;

    /// Request disabling a channel account due to a runtime error.
    ///
    /// Used when the sync loop hits an unrecoverable error (e.g. the access
    /// token was revoked).
    async fn request_disable_account(
        &self,
        _channel_type: ChannelType,
        _account_id: &str,
        _reason: &str,
    ) {
    }
}

/// Core channel plugin trait. Each messaging platform implements this.
#[async_trait]
pub trait ChannelPlugin: Send + Sync {
    /// Channel identifier (e.g. "matrix").
    fn id(&self) -> &str;

    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start an account connection.
    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> Result<()>;

    /// Stop an account connection.
    async fn stop_account(&mut self, account_id: &str) -> Result<()>;

    /// IDs of running accounts.
    fn account_ids(&self) -> Vec<String>;

    /// Get outbound adapter for sending messages.
    fn outbound(&self) -> Option<&dyn ChannelOutbound>;

    /// Get status adapter for health checks.
    fn status(&self) -> Option<&dyn ChannelStatus>;
}

/// Send messages to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, account_id: &str, to: &str, text: &str) -> Result<()>;

    /// Mark `message_id` in room `to` as read. No-op by default.
    async fn send_read_receipt(
        &self,
        _account_id: &str,
        _to: &str,
        _message_id: &str,
    ) -> Result<()> {
        Ok(())
    }
}

/// Probe channel account health.
#[async_trait]
pub trait ChannelStatus: Send + Sync {
    async fn probe(&self, account_id: &str) -> Result<ChannelHealthSnapshot>;
}

/// Channel health snapshot.
#[derive(Debug, Clone)]
pub struct ChannelHealthSnapshot {
    pub connected: bool,
    pub account_id: String,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_text_and_notice_are_textual() {
        assert!(ChannelMessageKind::Text.is_textual());
        assert!(ChannelMessageKind::Notice.is_textual());
        assert!(!ChannelMessageKind::Other.is_textual());
    }

    #[test]
    fn channel_type_display() {
        assert_eq!(ChannelType::Matrix.to_string(), "matrix");
        let json = serde_json::to_string(&ChannelType::Matrix).unwrap();
        assert_eq!(json, "\"matrix\"");
    }
}
