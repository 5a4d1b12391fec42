use thiserror::Error;

/// Top-level application error that composes all subsystem errors
#[derive(Error, Debug)]
pub(crate) enum RelayError {
    /// Configuration/watchlist errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Blockchain RPC errors
    #[error("Blockchain error: {0}")]
    Blockchain(#[from] crate::managers::blockchain::error::BlockchainError),

    /// Message broker errors
    #[error("Publisher error: {0}")]
    Publisher(#[from] crate::managers::publisher::error::PublisherError),
}
