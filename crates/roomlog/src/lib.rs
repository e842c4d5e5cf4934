//! Flat-file room logs: one `{room_key}.txt` per room, one line per message.
//!
//! Lines written by the bot's own account start with a secret marker so that
//! a later reload can tell them apart from everyone else's.

pub mod key;
pub mod store;

pub use {key::room_key, store::FlatFileLog};
