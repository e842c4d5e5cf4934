//! Matrix channel plugin for pineapple.
//!
//! Implements `ChannelPlugin` using `matrix-sdk`: password login or session
//! restore, a SQLite store for end-to-end encryption state, auto-join on
//! invite, and a sync loop that hands room messages to the reply pipeline.
#![recursion_limit = "256"]

pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod plugin;
pub mod session;
pub mod state;

pub use {config::MatrixAccountConfig, error::Error, plugin::MatrixPlugin};
