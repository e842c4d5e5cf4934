//! Inbound message processing pipeline: the glue between channels and the
//! responder.
//!
//! Flow: channel message → filter (ready, textual, non-empty) → append to the
//! room log → teach the responder → reply policy → read receipt → generate a
//! reply → deliver via channel outbound.

pub mod error;
pub mod legacy;
pub mod reply;

pub use {
    error::{Error, Result},
    legacy::LegacyReport,
    reply::{Dispatch, ReplyPipeline, ReplySettings},
};
