mod config;
mod error;
mod logger;
mod managers;
mod periodic;
mod runtime;
mod services;

use std::sync::Arc;

use config::{Config, ConfigError, watchlist::Watchlist};
use error::RelayError;
use managers::{
    blockchain::{BlockchainManager, FilterSpec, filter::compile_filter_request},
    publisher::RabbitPublisher,
};
use services::event_pipeline::EventPipeline;

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load .env file if present (development convenience)
    dotenvy::dotenv().ok();

    let config = match config::initialize_configuration() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to load configuration: {error}");
            std::process::exit(1);
        }
    };

    logger::initialize(&config.logger);
    display_startup_banner(&config);

    if let Err(error) = run(config).await {
        tracing::error!(error = %error, "Fatal error, shutting down");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), RelayError> {
    let watchlist = Watchlist::load(&config.blockchain.watchlist_path, config.blockchain.chain)?;
    tracing::info!(
        contracts = watchlist.contracts.len(),
        path = %config.blockchain.watchlist_path,
        "Loaded contract watchlist"
    );

    let manager = Arc::new(
        BlockchainManager::new(config.blockchain.chain, &config.blockchain.rpc_endpoint).await?,
    );
    let publisher = Arc::new(RabbitPublisher::connect(&config.broker).await?);
    let pipeline = Arc::new(EventPipeline::new(
        publisher,
        config.broker.routing_key.clone(),
    ));

    let specs = install_filters(&manager, watchlist).await?;
    if specs.is_empty() {
        tracing::warn!("Watchlist declares no events to listen for");
        return Ok(());
    }

    runtime::run(manager, pipeline, specs).await;
    Ok(())
}

/// Compile and install one node-side filter per watched event, in watchlist
/// order. Any invalid entry aborts startup.
async fn install_filters(
    manager: &BlockchainManager,
    watchlist: Watchlist,
) -> Result<Vec<FilterSpec>, RelayError> {
    let mut specs = Vec::new();

    for contract in watchlist.contracts {
        for (event_name, argument_filters) in contract.events {
            let event = contract
                .abi
                .events
                .get(&event_name)
                .and_then(|overloads| overloads.first())
                .cloned()
                .ok_or_else(|| ConfigError::UnknownEvent {
                    event: event_name.clone(),
                    contract: contract.address.to_string(),
                })?;

            let request = compile_filter_request(contract.address, event, &argument_filters)?;
            let spec = manager.install_filter(request, argument_filters).await?;
            specs.push(spec);
        }
    }

    Ok(specs)
}

fn display_startup_banner(config: &Config) {
    tracing::info!("==========================================");
    tracing::info!("  EVM Event Relay v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("==========================================");
    tracing::info!(
        blockchain = %config.blockchain.chain,
        exchange = %config.broker.exchange,
        "Starting relay"
    );
}
