use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] Box<figment::Error>),

    #[error("Failed to read watchlist file '{path}': {source}")]
    WatchlistRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse watchlist file '{path}': {source}")]
    WatchlistParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Blockchain '{0}' is not supported. Currently supported: {1}")]
    UnsupportedBlockchain(String, String),

    #[error("Chain '{chain}' is not supported for smart contract {contract}")]
    ChainMismatch { chain: String, contract: String },

    #[error("Invalid contract address '{address}' in watchlist")]
    InvalidContractAddress { address: String },

    #[error("Event '{event}' not found in ABI for contract {contract}")]
    UnknownEvent { event: String, contract: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
