use std::{path::PathBuf, sync::Arc};

use {
    anyhow::{Context, Result},
    tracing::{error, info, warn},
};

use {
    pineapple_auto_reply::{LegacyReport, ReplyPipeline, ReplySettings},
    pineapple_channels::{ChannelPlugin, message_log::MessageLog, registry::ChannelRegistry},
    pineapple_config::PineappleConfig,
    pineapple_markov::MarkovChain,
    pineapple_matrix::MatrixPlugin,
    pineapple_roomlog::FlatFileLog,
};

/// Everything the bot needs besides its channel connections.
struct Runtime {
    config: PineappleConfig,
    data_dir: PathBuf,
    log: Arc<FlatFileLog>,
    pipeline: Arc<ReplyPipeline>,
}

impl Runtime {
    fn build(config: PineappleConfig) -> Result<Self> {
        let marker = config.data.secret_marker.clone();
        if marker.is_empty() {
            anyhow::bail!(
                "data.secret_marker is not set; run `pineapple config check` for details"
            );
        }
        let data_dir = pineapple_config::data_dir(&config);
        let log = Arc::new(FlatFileLog::new(&data_dir, marker.clone()));
        let settings = ReplySettings {
            policy: config.reply.policy,
            mark_read: config.reply.mark_read,
            legacy_yield_every: config.reply.legacy_yield_every,
        };
        let pipeline = Arc::new(ReplyPipeline::new(
            Box::new(MarkovChain::new(marker)),
            log.clone(),
            settings,
        ));
        Ok(Self {
            config,
            data_dir,
            log,
            pipeline,
        })
    }

    async fn load_logs(&self) -> Result<LegacyReport> {
        let report = self
            .pipeline
            .load_legacy(&self.data_dir, &self.config.data.skip_legacy)
            .await
            .with_context(|| format!("loading room logs from {}", self.data_dir.display()))?;
        if report.failed > 0 {
            warn!(failed = report.failed, "some room logs could not be read");
        }
        Ok(report)
    }
}

/// Load the room logs, connect every configured Matrix account, and answer
/// messages until Ctrl-C.
pub async fn run(config: PineappleConfig) -> Result<()> {
    let rt = Runtime::build(config)?;
    std::fs::create_dir_all(&rt.data_dir)
        .with_context(|| format!("creating data directory {}", rt.data_dir.display()))?;
    rt.load_logs().await?;

    let mut plugin = MatrixPlugin::new()
        .with_event_sink(rt.pipeline.clone())
        .with_state_dir(rt.data_dir.join("matrix"));

    let mut accounts: Vec<_> = rt.config.channels.matrix.iter().collect();
    accounts.sort_by(|a, b| a.0.cmp(b.0));
    let configured = accounts.len();
    for (account_id, account_config) in accounts {
        if let Err(e) = plugin
            .start_account(account_id, account_config.clone())
            .await
        {
            error!(account_id = %account_id, error = %e, "failed to start matrix account");
        }
    }

    let started = plugin.account_ids().len();
    if configured > 0 && started == 0 {
        anyhow::bail!("no matrix account could be started");
    }
    if configured == 0 {
        warn!("no matrix accounts configured; nothing to listen to");
    }
    info!(started, configured, "pineapple running, press Ctrl-C to stop");

    let mut registry = ChannelRegistry::new();
    registry.register(Box::new(plugin));
    for (channel, snap) in registry.probe_all().await {
        let details = snap.details.unwrap_or_default();
        if snap.connected {
            info!(channel = %channel, account_id = %snap.account_id, details = %details, "account healthy");
        } else {
            warn!(channel = %channel, account_id = %snap.account_id, details = %details, "account unhealthy");
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("shutting down");
    registry.stop_all().await;
    Ok(())
}

/// Print one reply to `message`, or nothing if the chain has no answer.
pub async fn reply(config: PineappleConfig, message: &str) -> Result<()> {
    let rt = Runtime::build(config)?;
    rt.load_logs().await?;
    match rt.pipeline.reply_to(message) {
        Some(reply) => println!("{reply}"),
        None => info!("no reply"),
    }
    Ok(())
}

/// Print load and chain statistics as JSON.
pub async fn stats(config: PineappleConfig) -> Result<()> {
    let rt = Runtime::build(config)?;
    let report = rt.load_logs().await?;
    let out = serde_json::json!({
        "data_dir": rt.data_dir,
        "rooms": rt.log.list_rooms(),
        "legacy": report,
        "chain": rt.pipeline.stats(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(dir: &std::path::Path) -> PineappleConfig {
        let mut config = PineappleConfig::default();
        config.data.dir = Some(dir.to_path_buf());
        config.data.secret_marker = "MARK".into();
        config
    }

    #[test]
    fn build_requires_marker() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.data.secret_marker.clear();
        assert!(Runtime::build(config).is_err());
    }

    #[tokio::test]
    async fn loads_logs_and_replies() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("matrix_abcexample.org.txt"),
            "how are you\nfine thanks\nMARKI am a bot\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("skipme.txt"), "ignored words\n").unwrap();

        let mut config = config_for(dir.path());
        config.data.skip_legacy = vec!["skipme".into()];
        let rt = Runtime::build(config).unwrap();
        let report = rt.load_logs().await.unwrap();

        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped, 1);
        assert!(rt.pipeline.is_ready());
        assert_eq!(rt.log.list_rooms(), vec!["matrix_abcexample.org", "skipme"]);
        assert_eq!(rt.pipeline.reply_to("you").as_deref(), Some("fine thanks"));
    }

    #[tokio::test]
    async fn missing_data_dir_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let rt = Runtime::build(config_for(&dir.path().join("nope"))).unwrap();
        assert!(rt.load_logs().await.is_err());
    }
}
