//! Contract watchlist document.
//!
//! Declares which contracts and events to monitor, loaded once at startup:
//!
//! ```json
//! {
//!   "contracts": [{
//!     "address": "0x...",
//!     "blockchain": "ethereum",
//!     "abi": [...],
//!     "events_to_listen": {
//!       "PairCreated": { "argument_filters": { "fromBlock": "latest" } }
//!     }
//!   }]
//! }
//! ```

use alloy::{json_abi::JsonAbi, primitives::Address};
use serde::Deserialize;

use super::{Blockchain, ConfigError};

/// Ordered filter-parameter map. Insertion order is preserved because
/// serde_json is built with `preserve_order`; filter construction depends on
/// that for determinism.
pub(crate) type ArgumentFilters = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Deserialize)]
struct WatchlistDocument {
    contracts: Vec<ContractEntry>,
}

#[derive(Debug, Deserialize)]
struct ContractEntry {
    address: String,
    blockchain: String,
    abi: JsonAbi,
    events_to_listen: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Default)]
struct EventEntry {
    #[serde(default)]
    argument_filters: ArgumentFilters,
}

/// One validated watchlist contract: parsed address, its ABI, and the
/// events to monitor with their argument filters (in document order).
#[derive(Debug)]
pub(crate) struct WatchlistContract {
    pub address: Address,
    pub abi: JsonAbi,
    pub events: Vec<(String, ArgumentFilters)>,
}

#[derive(Debug)]
pub(crate) struct Watchlist {
    pub contracts: Vec<WatchlistContract>,
}

impl Watchlist {
    /// Load and validate the watchlist against the configured chain.
    /// Any entry targeting another chain is fatal, not skipped.
    pub(crate) fn load(path: &str, chain: Blockchain) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::WatchlistRead {
            path: path.to_string(),
            source,
        })?;
        let document: WatchlistDocument =
            serde_json::from_str(&raw).map_err(|source| ConfigError::WatchlistParse {
                path: path.to_string(),
                source,
            })?;

        Self::from_document(document, chain)
    }

    fn from_document(document: WatchlistDocument, chain: Blockchain) -> Result<Self, ConfigError> {
        let mut contracts = Vec::with_capacity(document.contracts.len());

        for entry in document.contracts {
            let address: Address =
                entry
                    .address
                    .parse()
                    .map_err(|_| ConfigError::InvalidContractAddress {
                        address: entry.address.clone(),
                    })?;

            if entry.blockchain != chain.as_str() {
                return Err(ConfigError::ChainMismatch {
                    chain: entry.blockchain,
                    contract: entry.address,
                });
            }

            let mut events = Vec::with_capacity(entry.events_to_listen.len());
            for (event_name, value) in entry.events_to_listen {
                let event: EventEntry = serde_json::from_value(value).map_err(|source| {
                    ConfigError::WatchlistParse {
                        path: format!("events_to_listen.{event_name}"),
                        source,
                    }
                })?;
                events.push((event_name, event.argument_filters));
            }

            contracts.push(WatchlistContract {
                address,
                abi: entry.abi,
                events,
            });
        }

        Ok(Self { contracts })
    }
}
