use alloy::transports::{RpcError, TransportErrorKind};

#[derive(Debug, thiserror::Error)]
pub(crate) enum BlockchainError {
    #[error("RPC connection failed for endpoint '{endpoint}': {reason}")]
    RpcConnectionFailed { endpoint: String, reason: String },

    #[error("Connectivity check failed: {0}")]
    ConnectivityCheck(#[source] RpcError<TransportErrorKind>),

    #[error("Failed to create filter for event '{event}': {source}")]
    CreateFilter {
        event: String,
        #[source]
        source: RpcError<TransportErrorKind>,
    },

    #[error("Failed to fetch new entries for event '{event}': {source}")]
    GetFilterChanges {
        event: String,
        #[source]
        source: RpcError<TransportErrorKind>,
    },

    #[error("Failed to uninstall filter for event '{event}': {source}")]
    UninstallFilter {
        event: String,
        #[source]
        source: RpcError<TransportErrorKind>,
    },

    #[error("Filter parameter '{param}' does not match any indexed input of event '{event}'")]
    UnknownFilterParameter { param: String, event: String },

    #[error("Filter parameter '{param}' has an unencodable value for type '{solidity_type}'")]
    UnencodableFilterValue { param: String, solidity_type: String },

    #[error("Filter parameter '{param}' must be a scalar string or integer")]
    InvalidFilterValue { param: String },

    #[error("Event '{event}' uses more than three indexed filter parameters")]
    TooManyTopics { event: String },

    #[error("Invalid block reference '{value}' for parameter '{param}'")]
    InvalidBlockReference { param: String, value: String },
}
