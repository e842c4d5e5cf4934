/// Config schema types (data directory, reply behaviour, channel accounts).
use std::{collections::HashMap, path::PathBuf};

use {
    pineapple_channels::gating::ReplyPolicy,
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PineappleConfig {
    pub data: DataConfig,
    pub reply: ReplyConfig,
    pub channels: ChannelsConfig,
}

/// Where room logs live and how they are read back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding the `*.txt` room logs. Falls back to the platform
    /// data directory when unset.
    pub dir: Option<PathBuf>,
    /// Prefix marking the bot's own messages in room logs. Must be set and
    /// must never occur at the start of a real message.
    pub secret_marker: String,
    /// Log file stems to leave out of the startup load.
    pub skip_legacy: Vec<String>,
}

/// Reply behaviour of the inbound pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    /// Which rooms get replies. Defaults to encrypted rooms only.
    pub policy: ReplyPolicy,
    /// Send a read receipt before answering. Defaults to true.
    pub mark_read: bool,
    /// Yield to the runtime after this many log files during the startup load.
    pub legacy_yield_every: usize,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            policy: ReplyPolicy::default(),
            mark_read: true,
            legacy_yield_every: 1,
        }
    }
}

/// Channel accounts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Matrix accounts, keyed by account ID. The value is handed to the
    /// Matrix plugin as-is.
    #[serde(default)]
    pub matrix: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = PineappleConfig::default();
        assert!(cfg.data.dir.is_none());
        assert!(cfg.data.secret_marker.is_empty());
        assert_eq!(cfg.reply.policy, ReplyPolicy::Encrypted);
        assert!(cfg.reply.mark_read);
        assert_eq!(cfg.reply.legacy_yield_every, 1);
        assert!(cfg.channels.matrix.is_empty());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: PineappleConfig = toml::from_str(
            r#"
[data]
secret_marker = "MARK"
skip_legacy = ["661338676340719616"]

[reply]
policy = "always"

[channels.matrix.main]
homeserver = "https://matrix.example.org"
username = "pineapple"
"#,
        )
        .unwrap();
        assert_eq!(cfg.data.secret_marker, "MARK");
        assert_eq!(cfg.data.skip_legacy, vec!["661338676340719616"]);
        assert_eq!(cfg.reply.policy, ReplyPolicy::Always);
        assert!(cfg.reply.mark_read);
        assert_eq!(
            cfg.channels.matrix["main"]["homeserver"],
            "https://matrix.example.org"
        );
    }
}
