//! Blockchain manager: provider lifecycle, filter installation, and the
//! polling seam the filter tasks run against.

pub(crate) mod encoding;
pub(crate) mod error;
pub(crate) mod error_classification;
pub(crate) mod filter;
mod provider;
pub(crate) mod rpc_executor;

use std::future::Future;

use alloy::{
    json_abi::Event,
    primitives::{Address, U256},
    providers::Provider,
    rpc::types::Log,
};

use crate::config::{Blockchain, watchlist::ArgumentFilters};
use error::BlockchainError;
use filter::{FilterRequest, build_filter};
use provider::BlockchainProvider;
use rpc_executor::{RetryPolicy, execute_with_retry};

/// One compiled, installed event filter. Owned exclusively by its polling
/// task; `filter_id` is the node-side filter handle and lives until the
/// task is cancelled.
#[derive(Debug)]
pub(crate) struct FilterSpec {
    pub contract_address: Address,
    pub event_name: String,
    pub event: Event,
    pub argument_filters: ArgumentFilters,
    pub filter_id: U256,
}

/// "Get newly appeared log entries since last poll" seam over the RPC
/// collaborator. Polls for different specs are independent; an empty vec
/// means nothing new. Mocked in task tests.
pub(crate) trait FilterSource: Send + Sync {
    fn poll(
        &self,
        spec: &FilterSpec,
    ) -> impl Future<Output = Result<Vec<Log>, BlockchainError>> + Send;

    fn uninstall(
        &self,
        spec: &FilterSpec,
    ) -> impl Future<Output = Result<(), BlockchainError>> + Send;
}

pub(crate) struct BlockchainManager {
    blockchain: Blockchain,
    provider: BlockchainProvider,
    retry_policy: RetryPolicy,
}

impl BlockchainManager {
    /// Connect to the endpoint and verify connectivity before anything else
    /// uses the provider. A failed connectivity check is fatal for startup.
    pub(crate) async fn new(
        blockchain: Blockchain,
        rpc_endpoint: &str,
    ) -> Result<Self, BlockchainError> {
        let provider = provider::initialize_provider(rpc_endpoint).await?;
        let manager = Self {
            blockchain,
            provider,
            retry_policy: RetryPolicy::rpc_default(),
        };
        manager.check_connection(rpc_endpoint).await?;
        Ok(manager)
    }

    async fn check_connection(&self, endpoint: &str) -> Result<(), BlockchainError> {
        let chain_id = execute_with_retry(&self.retry_policy, "connectivity_check", || async {
            self.provider.get_chain_id().await
        })
        .await
        .map_err(BlockchainError::ConnectivityCheck)?;

        tracing::info!(
            blockchain = %self.blockchain,
            chain_id,
            endpoint,
            "Successfully connected to endpoint"
        );
        Ok(())
    }

    /// Install a compiled filter request on the node. The returned spec
    /// carries the node-side filter handle.
    pub(crate) async fn install_filter(
        &self,
        request: FilterRequest,
        argument_filters: ArgumentFilters,
    ) -> Result<FilterSpec, BlockchainError> {
        let filter = build_filter(&request)?;

        let filter_id = execute_with_retry(&self.retry_policy, "new_filter", || async {
            self.provider.new_filter(&filter).await
        })
        .await
        .map_err(|source| BlockchainError::CreateFilter {
            event: request.event.name.clone(),
            source,
        })?;

        tracing::info!(
            contract = %request.contract_address,
            event = %request.event.name,
            filter_id = %filter_id,
            arguments = ?request.params,
            "Created event filter"
        );

        Ok(FilterSpec {
            contract_address: request.contract_address,
            event_name: request.event.name.clone(),
            event: request.event,
            argument_filters,
            filter_id,
        })
    }
}

impl FilterSource for BlockchainManager {
    async fn poll(&self, spec: &FilterSpec) -> Result<Vec<Log>, BlockchainError> {
        execute_with_retry(&self.retry_policy, "get_filter_changes", || async {
            self.provider
                .get_filter_changes::<Log>(spec.filter_id)
                .await
        })
        .await
        .map_err(|source| BlockchainError::GetFilterChanges {
            event: spec.event_name.clone(),
            source,
        })
    }

    async fn uninstall(&self, spec: &FilterSpec) -> Result<(), BlockchainError> {
        self.provider
            .uninstall_filter(spec.filter_id)
            .await
            .map_err(|source| BlockchainError::UninstallFilter {
                event: spec.event_name.clone(),
                source,
            })?;
        tracing::debug!(
            event = %spec.event_name,
            filter_id = %spec.filter_id,
            "Uninstalled event filter"
        );
        Ok(())
    }
}
