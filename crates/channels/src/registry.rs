use {
    super::plugin::{ChannelHealthSnapshot, ChannelPlugin},
    std::collections::HashMap,
};

/// Registry of all loaded channel plugins.
pub struct ChannelRegistry {
    plugins: HashMap<String, Box<dyn ChannelPlugin>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn ChannelPlugin>) {
        self.plugins.insert(plugin.id().to_string(), plugin);
    }

    /// Probe every running account, ordered by channel then account.
    ///
    /// A failed probe is reported as a disconnected snapshot.
    pub async fn probe_all(&self) -> Vec<(String, ChannelHealthSnapshot)> {
        let mut ids: Vec<&String> = self.plugins.keys().collect();
        ids.sort_unstable();

        let mut out = Vec::new();
        for id in ids {
            let Some(plugin) = self.plugins.get(id) else {
                continue;
            };
            let Some(status) = plugin.status() else {
                continue;
            };
            for account_id in plugin.account_ids() {
                let snap = match status.probe(&account_id).await {
                    Ok(snap) => snap,
                    Err(e) => ChannelHealthSnapshot {
                        connected: false,
                        account_id: account_id.clone(),
                        details: Some(format!("probe failed: {e}")),
                    },
                };
                out.push((id.clone(), snap));
            }
        }
        out
    }

    /// Stop every account of every plugin. Errors are logged, not returned.
    pub async fn stop_all(&mut self) {
        for (id, plugin) in &mut self.plugins {
            for account_id in plugin.account_ids() {
                if let Err(e) = plugin.stop_account(&account_id).await {
                    tracing::warn!(channel = %id, account_id, error = %e, "failed to stop account");
                }
            }
        }
    }
}
