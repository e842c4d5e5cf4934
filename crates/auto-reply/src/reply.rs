use std::{
    path::Path,
    sync::{
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use {
    async_trait::async_trait,
    pineapple_channels::{
        ChannelEventSink, ChannelOutbound, ChannelType, InboundMessage, gating::ReplyPolicy,
        message_log::{MessageLog, MessageLogEntry},
    },
    pineapple_markov::{ChainStats, Responder},
    pineapple_roomlog::room_key,
    tracing::{debug, info, warn},
};

use crate::{Result, legacy::LegacyReport};

/// Knobs for the reply side of the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ReplySettings {
    pub policy: ReplyPolicy,
    /// Send a read receipt before answering.
    pub mark_read: bool,
    /// Yield to the runtime after this many legacy files (0 = after each).
    pub legacy_yield_every: usize,
}

impl Default for ReplySettings {
    fn default() -> Self {
        Self {
            policy: ReplyPolicy::Encrypted,
            mark_read: true,
            legacy_yield_every: 1,
        }
    }
}

/// What happened to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Legacy logs are still loading; the message was dropped.
    NotReady,
    /// Not a text or notice message.
    NonText,
    EmptyBody,
    /// Logged and learned; the room does not get replies.
    Logged,
    /// Logged and learned from the bot's own account; never answered.
    OwnMessage,
    /// Answerable, but the responder had nothing to say.
    NoReply,
    Replied(String),
}

/// Logs every message, teaches the responder, and answers where allowed.
pub struct ReplyPipeline {
    responder: RwLock<Box<dyn Responder>>,
    log: Arc<dyn MessageLog>,
    settings: ReplySettings,
    ready: AtomicBool,
}

impl ReplyPipeline {
    pub fn new(
        responder: Box<dyn Responder>,
        log: Arc<dyn MessageLog>,
        settings: ReplySettings,
    ) -> Self {
        Self {
            responder: RwLock::new(responder),
            log,
            settings,
            ready: AtomicBool::new(false),
        }
    }

    /// Whether inbound messages are being processed.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Start processing inbound messages without a legacy load.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    fn responder(&self) -> RwLockReadGuard<'_, Box<dyn Responder>> {
        self.responder.read().unwrap_or_else(|e| e.into_inner())
    }

    fn responder_mut(&self) -> RwLockWriteGuard<'_, Box<dyn Responder>> {
        self.responder.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Feed every `*.txt` log in `dir` to the responder, then mark the
    /// pipeline ready. Logs whose stem is listed in `skip` are left out.
    ///
    /// An unreadable log is reported and skipped; an unreadable directory
    /// aborts the load.
    pub async fn load_legacy(&self, dir: &Path, skip: &[String]) -> Result<LegacyReport> {
        let logs = crate::legacy::room_logs(dir)?;
        let mut report = LegacyReport::default();

        for (channel, path) in logs {
            if skip.iter().any(|s| *s == channel) {
                debug!(channel = %channel, "skipping excluded room log");
                report.skipped += 1;
                continue;
            }
            let loaded = self.responder_mut().load_file(&channel, &path);
            match loaded {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    warn!(channel = %channel, error = %e, "failed to load room log");
                    report.failed += 1;
                },
            }
            if yields_after(report.loaded + report.failed, self.settings.legacy_yield_every) {
                tokio::task::yield_now().await;
            }
        }

        self.mark_ready();
        let stats = self.stats();
        info!(
            dir = %dir.display(),
            loaded = report.loaded,
            skipped = report.skipped,
            failed = report.failed,
            messages = stats.messages,
            vocabulary = stats.vocabulary,
            "room logs loaded"
        );
        Ok(report)
    }

    /// Run one inbound message through the pipeline.
    pub async fn handle(
        &self,
        msg: &InboundMessage,
        outbound: &dyn ChannelOutbound,
    ) -> Result<Dispatch> {
        if !self.is_ready() {
            debug!(chat_id = %msg.chat_id, "pipeline not ready, dropping message");
            return Ok(Dispatch::NotReady);
        }
        if !msg.kind.is_textual() {
            return Ok(Dispatch::NonText);
        }
        if msg.body.is_empty() {
            return Ok(Dispatch::EmptyBody);
        }

        let room = room_key(msg.channel_type, &msg.chat_id);
        self.log
            .append(MessageLogEntry::new(&room, &msg.body, msg.from_self))
            .await?;

        {
            let mut responder = self.responder_mut();
            if msg.from_self {
                responder.set_message(&room, &msg.body);
            } else {
                responder.add_message(&room, &msg.body);
            }
        }

        if msg.from_self {
            return Ok(Dispatch::OwnMessage);
        }
        if !self.settings.policy.allows(msg.encrypted) {
            return Ok(Dispatch::Logged);
        }

        if self.settings.mark_read
            && let Some(ref event_id) = msg.message_id
            && let Err(e) = outbound
                .send_read_receipt(&msg.account_id, &msg.chat_id, event_id)
                .await
        {
            warn!(chat_id = %msg.chat_id, error = %e, "failed to send read receipt");
        }

        let Some(reply) = self.reply_to(&msg.body) else {
            debug!(room = %room, "responder had no reply");
            return Ok(Dispatch::NoReply);
        };
        outbound
            .send_text(&msg.account_id, &msg.chat_id, &reply)
            .await?;
        debug!(room = %room, reply_len = reply.len(), "sent reply");
        Ok(Dispatch::Replied(reply))
    }

    /// Ask the responder for a reply without touching any room.
    pub fn reply_to(&self, text: &str) -> Option<String> {
        self.responder().get_reply(text)
    }

    pub fn stats(&self) -> ChainStats {
        self.responder().stats()
    }
}

/// Whether the legacy load hands control back to the runtime after
/// `processed` files. An `every` of 0 behaves like 1.
fn yields_after(processed: usize, every: usize) -> bool {
    processed % every.max(1) == 0
}

#[async_trait]
impl ChannelEventSink for ReplyPipeline {
    async fn dispatch_inbound(
        &self,
        msg: &InboundMessage,
        outbound: &dyn ChannelOutbound,
    ) -> anyhow::Result<()> {
        let outcome = self.handle(msg, outbound).await?;
        debug!(
            channel = %msg.channel_type,
            account_id = %msg.account_id,
            chat_id = %msg.chat_id,
            sender = %msg.sender,
            ?outcome,
            "inbound message dispatched"
        );
        Ok(())
    }

    async fn request_disable_account(
        &self,
        channel_type: ChannelType,
        account_id: &str,
        reason: &str,
    ) {
        warn!(channel = %channel_type, account_id, reason, "channel account disabled");
    }
}
