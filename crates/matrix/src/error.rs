use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("session file {}: {source}", path.display())]
    Session {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session file {} is malformed: {source}", path.display())]
    SessionFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
