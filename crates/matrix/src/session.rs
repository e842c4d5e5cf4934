//! Saved login session, so restarts reuse the same device and keys.

use std::path::Path;

use {
    matrix_sdk::{
        SessionMeta,
        authentication::{SessionTokens, matrix::MatrixSession},
        ruma::OwnedUserId,
    },
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user_id: String,
    pub device_id: String,
}

impl SavedSession {
    /// Snapshot the client's current session, including rotated tokens.
    pub fn from_matrix_session(session: &MatrixSession) -> Self {
        Self {
            access_token: session.tokens.access_token.clone(),
            refresh_token: session.tokens.refresh_token.clone(),
            user_id: session.meta.user_id.to_string(),
            device_id: session.meta.device_id.to_string(),
        }
    }

    pub fn to_matrix_session(&self) -> Result<MatrixSession> {
        let user_id: OwnedUserId = self.user_id.parse().map_err(|e| {
            Error::message(format!("invalid stored user_id {}: {e}", self.user_id))
        })?;
        Ok(MatrixSession {
            meta: SessionMeta {
                user_id,
                device_id: self.device_id.clone().into(),
            },
            tokens: SessionTokens {
                access_token: self.access_token.clone(),
                refresh_token: self.refresh_token.clone(),
            },
        })
    }
}

/// Read a saved session. A missing file is `Ok(None)`.
pub fn load_session(path: &Path) -> Result<Option<SavedSession>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(Error::Session {
                path: path.to_path_buf(),
                source,
            });
        },
    };
    serde_json::from_str(&data)
        .map(Some)
        .map_err(|source| Error::SessionFormat {
            path: path.to_path_buf(),
            source,
        })
}

/// Write the session, creating parent directories as needed.
pub fn save_session(path: &Path, session: &SavedSession) -> Result<()> {
    let io_err = |source| Error::Session {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let data = serde_json::to_string_pretty(session).map_err(|source| Error::SessionFormat {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, data).map_err(io_err)
}
