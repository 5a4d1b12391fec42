use std::sync::Arc;

use alloy::{
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
    rpc::client::RpcClient,
    transports::http::{Http, reqwest::Url},
};

use crate::managers::blockchain::error::BlockchainError;

/// Use Arc<DynProvider> for thread-safe sharing across polling tasks.
pub(crate) type BlockchainProvider = Arc<DynProvider>;

/// Creates a provider for the configured endpoint. The URL scheme decides
/// the transport: `ws://`/`wss://` use the pubsub transport, anything else
/// goes over HTTP.
pub(crate) async fn initialize_provider(
    endpoint: &str,
) -> Result<BlockchainProvider, BlockchainError> {
    let client = if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        let ws_connect = WsConnect::new(endpoint);
        RpcClient::connect_pubsub(ws_connect).await.map_err(|e| {
            BlockchainError::RpcConnectionFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        })?
    } else {
        let url = endpoint
            .parse::<Url>()
            .map_err(|e| BlockchainError::RpcConnectionFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        RpcClient::new(Http::new(url), false)
    };

    let provider = ProviderBuilder::new().connect_client(client);

    tracing::debug!("RPC endpoint added: {}", endpoint);

    Ok(Arc::new(provider.erased()))
}
