use std::path::{Path, PathBuf};

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

/// Configuration for a single Matrix account.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct MatrixAccountConfig {
    /// Homeserver base URL, e.g. `https://matrix.example.org`.
    pub homeserver: String,

    /// Localpart or full user ID.
    pub username: String,

    /// Account password. Only needed when no saved session exists.
    pub password: Secret<String>,

    /// Display name of the device created on first login.
    pub device_name: String,

    /// SQLite store for encryption keys and sync state.
    /// Defaults to `<state dir>/<account>/store`.
    pub store_dir: Option<PathBuf>,

    /// JSON file holding the access token and device ID.
    /// Defaults to `<state dir>/<account>/session.json`.
    pub session_file: Option<PathBuf>,

    /// Long-poll timeout of each sync request (ms).
    pub sync_timeout_ms: u64,

    /// Join rooms automatically when invited.
    pub autojoin: bool,

    /// Room IDs to listen in. Empty means every joined room.
    pub room_allowlist: Vec<String>,
}

impl MatrixAccountConfig {
    pub fn store_dir_in(&self, state_dir: &Path, account_id: &str) -> PathBuf {
        self.store_dir
            .clone()
            .unwrap_or_else(|| state_dir.join(account_id).join("store"))
    }

    pub fn session_file_in(&self, state_dir: &Path, account_id: &str) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| state_dir.join(account_id).join("session.json"))
    }

    pub fn has_password(&self) -> bool {
        !self.password.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for MatrixAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixAccountConfig")
            .field("homeserver", &self.homeserver)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("device_name", &self.device_name)
            .finish_non_exhaustive()
    }
}

impl Default for MatrixAccountConfig {
    fn default() -> Self {
        Self {
            homeserver: String::new(),
            username: String::new(),
            password: Secret::new(String::new()),
            device_name: "pineapple".into(),
            store_dir: None,
            session_file: None,
            sync_timeout_ms: 30_000,
            autojoin: true,
            room_allowlist: Vec::new(),
        }
    }
}
