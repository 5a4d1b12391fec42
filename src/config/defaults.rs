use super::{Blockchain, BlockchainConfig, BrokerConfig, Config};
use crate::logger::{LogFormat, LoggerConfig};

/// Baseline configuration, overridable by config.toml and RELAY__* env vars.
pub(super) fn config() -> Config {
    Config {
        blockchain: BlockchainConfig {
            chain: Blockchain::Ethereum,
            rpc_endpoint: String::new(),
            watchlist_path: "contract-watchlist.json".to_string(),
        },
        broker: BrokerConfig {
            host: "localhost".to_string(),
            port: 5672,
            user: "guest".to_string(),
            password: "guest".to_string(),
            exchange: "blockchain-events".to_string(),
            routing_key: "events.ethereum".to_string(),
        },
        logger: LoggerConfig {
            level: "evm_event_relay=info".to_string(),
            format: LogFormat::Pretty,
        },
    }
}
