use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use {
    anyhow::Result,
    async_trait::async_trait,
    tracing::{info, warn},
};

use pineapple_channels::{
    ChannelEventSink,
    plugin::{ChannelHealthSnapshot, ChannelOutbound, ChannelPlugin, ChannelStatus},
};

use crate::{bot, config::MatrixAccountConfig, outbound::MatrixOutbound, state::AccountStateMap};

/// Cache TTL for probe results.
const PROBE_CACHE_TTL: Duration = Duration::from_secs(30);

/// Matrix channel plugin.
pub struct MatrixPlugin {
    accounts: AccountStateMap,
    outbound: MatrixOutbound,
    event_sink: Option<Arc<dyn ChannelEventSink>>,
    /// Parent of the per-account store and session defaults.
    state_dir: PathBuf,
    probe_cache: RwLock<HashMap<String, (ChannelHealthSnapshot, Instant)>>,
}

impl MatrixPlugin {
    pub fn new() -> Self {
        let accounts: AccountStateMap = Arc::new(RwLock::new(HashMap::new()));
        let outbound = MatrixOutbound {
            accounts: Arc::clone(&accounts),
        };
        Self {
            accounts,
            outbound,
            event_sink: None,
            state_dir: PathBuf::from("matrix"),
            probe_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn ChannelEventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }
}

impl Default for MatrixPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelPlugin for MatrixPlugin {
    fn id(&self) -> &str {
        "matrix"
    }

    fn name(&self) -> &str {
        "Matrix"
    }

    async fn start_account(&mut self, account_id: &str, config: serde_json::Value) -> Result<()> {
        let mx_config: MatrixAccountConfig = serde_json::from_value(config)?;

        if mx_config.homeserver.trim().is_empty() {
            return Err(anyhow::anyhow!("matrix homeserver is required"));
        }
        if mx_config.username.trim().is_empty() {
            return Err(anyhow::anyhow!("matrix username is required"));
        }

        let already_running = {
            let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
            accounts.contains_key(account_id)
        };
        if already_running {
            return Err(anyhow::anyhow!(
                "matrix account {account_id} is already running"
            ));
        }

        info!(account_id, homeserver = %mx_config.homeserver, "starting matrix account");

        bot::start_sync(
            account_id.to_string(),
            mx_config,
            &self.state_dir,
            Arc::clone(&self.accounts),
            self.event_sink.clone(),
        )
        .await?;

        Ok(())
    }

    async fn stop_account(&mut self, account_id: &str) -> Result<()> {
        let removed = {
            let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
            accounts.remove(account_id)
        };

        if let Some(state) = removed {
            info!(account_id, "stopping matrix account");
            state.cancel.cancel();
        } else {
            warn!(account_id, "matrix account not found");
        }
        if let Ok(mut cache) = self.probe_cache.write() {
            cache.remove(account_id);
        }

        Ok(())
    }

    fn account_ids(&self) -> Vec<String> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = accounts.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    fn outbound(&self) -> Option<&dyn ChannelOutbound> {
        Some(&self.outbound)
    }

    fn status(&self) -> Option<&dyn ChannelStatus> {
        Some(self)
    }
}

#[async_trait]
impl ChannelStatus for MatrixPlugin {
    async fn probe(&self, account_id: &str) -> Result<ChannelHealthSnapshot> {
        // Return cached result if fresh enough.
        if let Ok(cache) = self.probe_cache.read()
            && let Some((snap, ts)) = cache.get(account_id)
            && ts.elapsed() < PROBE_CACHE_TTL
        {
            return Ok(snap.clone());
        }

        let client = {
            let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
            accounts.get(account_id).map(|s| s.client.clone())
        };

        let result = match client {
            Some(client) => match client.whoami().await {
                Ok(me) => ChannelHealthSnapshot {
                    connected: true,
                    account_id: account_id.to_string(),
                    details: Some(format!("User: {}", me.user_id)),
                },
                Err(e) => ChannelHealthSnapshot {
                    connected: false,
                    account_id: account_id.to_string(),
                    details: Some(format!("API error: {e}")),
                },
            },
            None => ChannelHealthSnapshot {
                connected: false,
                account_id: account_id.to_string(),
                details: Some("account not started".into()),
            },
        };

        if let Ok(mut cache) = self.probe_cache.write() {
            cache.insert(account_id.to_string(), (result.clone(), Instant::now()));
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity() {
        let plugin = MatrixPlugin::default();
        assert_eq!(plugin.id(), "matrix");
        assert_eq!(plugin.name(), "Matrix");
        assert!(plugin.account_ids().is_empty());
        assert!(plugin.outbound().is_some());
        assert!(plugin.status().is_some());
    }

    #[tokio::test]
    async fn start_requires_homeserver() {
        let mut plugin = MatrixPlugin::new();
        let err = plugin
            .start_account("main", serde_json::json!({"username": "pineapple"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("homeserver"), "{err}");
    }

    #[tokio::test]
    async fn start_requires_username() {
        let mut plugin = MatrixPlugin::new();
        let err = plugin
            .start_account(
                "main",
                serde_json::json!({"homeserver": "https://matrix.example.org"}),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("username"), "{err}");
    }

    #[tokio::test]
    async fn start_rejects_malformed_config() {
        let mut plugin = MatrixPlugin::new();
        let result = plugin
            .start_account("main", serde_json::json!({"autojoin": "yes please"}))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stop_unknown_account_is_ok() {
        let mut plugin = MatrixPlugin::new();
        plugin.stop_account("nonexistent").await.unwrap();
    }

    #[tokio::test]
    async fn probe_unknown_account_is_disconnected_and_cached() {
        let plugin = MatrixPlugin::new();
        let snap = plugin.probe("nonexistent").await.unwrap();
        assert!(!snap.connected);
        assert_eq!(snap.details.as_deref(), Some("account not started"));

        let cache = plugin.probe_cache.read().unwrap();
        assert!(cache.contains_key("nonexistent"));
    }
}
