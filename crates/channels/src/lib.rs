//! Channel plugin system.
//!
//! A channel (currently Matrix) implements the `ChannelPlugin` trait with
//! sub-traits for outbound messaging and status. Inbound messages are
//! normalized into [`InboundMessage`] and handed to a [`ChannelEventSink`].

pub mod error;
pub mod gating;
pub mod message_log;
pub mod plugin;
pub mod registry;

pub use {
    error::{Error, Result},
    plugin::{
        ChannelEventSink, ChannelHealthSnapshot, ChannelMessageKind, ChannelOutbound,
        ChannelPlugin, ChannelStatus, ChannelType, InboundMessage,
    },
};
