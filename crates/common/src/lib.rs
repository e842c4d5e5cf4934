//! Error helpers shared by the pineapple crates.

pub mod error;

pub use error::FromMessage;
