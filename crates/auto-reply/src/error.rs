use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Channel(#[from] pineapple_channels::Error),

    #[error(transparent)]
    Responder(#[from] pineapple_markov::Error),

    #[error("cannot scan log directory {}: {source}", path.display())]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sending through the channel outbound failed.
    #[error(transparent)]
    Outbound(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
