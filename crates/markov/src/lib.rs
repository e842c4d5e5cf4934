//! Word-level Markov chain that learns from chat logs and produces replies.
//!
//! The chain is keyed per channel only for "what was said last", which is
//! what links one message's ending to the next message's opening word.
//! Everything else (word transitions, message lengths) is global.

pub mod chain;
pub mod choice;
pub mod ending;
pub mod error;
pub mod responder;

pub use {
    chain::{ChainStats, MarkovChain},
    choice::ChoiceMap,
    error::{Error, Result},
    responder::Responder,
};
