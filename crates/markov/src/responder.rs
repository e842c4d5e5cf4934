use std::{fmt::Debug, path::Path};

use crate::{
    Result,
    chain::{ChainStats, MarkovChain},
};

/// Reply generator fed by the chat pipeline.
///
/// Own messages go through [`Responder::set_message`] so the generator knows
/// what was said last without learning from itself.
pub trait Responder: Debug + Send + Sync {
    fn add_message(&mut self, channel: &str, message: &str);
    fn set_message(&mut self, channel: &str, message: &str);
    fn load_file(&mut self, channel: &str, path: &Path) -> Result<()>;
    fn get_reply(&self, message: &str) -> Option<String>;
    fn stats(&self) -> ChainStats;
}

impl Responder for MarkovChain {
    fn add_message(&mut self, channel: &str, message: &str) {
        MarkovChain::add_message(self, channel, message);
    }

    fn set_message(&mut self, channel: &str, message: &str) {
        MarkovChain::set_message(self, channel, message);
    }

    fn load_file(&mut self, channel: &str, path: &Path) -> Result<()> {
        MarkovChain::load_file(self, channel, path)
    }

    fn get_reply(&self, message: &str) -> Option<String> {
        MarkovChain::get_reply(self, message)
    }

    fn stats(&self) -> ChainStats {
        MarkovChain::stats(self)
    }
}
