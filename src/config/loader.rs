use std::path::Path;

use clap::{Arg, Command};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use super::{Config, ConfigError, defaults};

pub(crate) fn initialize_configuration() -> Result<Config, ConfigError> {
    // Parse CLI arguments for a custom config file
    let matches = Command::new("EVM Event Relay")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file (.toml format)"),
        )
        .get_matches();

    let custom_config_path = matches.get_one::<String>("config").map(String::as_str);

    load_configuration(custom_config_path)
}

/// Build configuration with layered sources (priority: lowest to highest):
/// in-code defaults, config.toml, custom config file, RELAY__* env vars.
fn load_configuration(custom_config_path: Option<&str>) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(defaults::config()));

    if Path::new("config.toml").exists() {
        figment = figment.merge(Toml::file("config.toml"));
    }

    if let Some(config_path) = custom_config_path {
        figment = figment.merge(Toml::file(config_path));
    }

    // Environment overrides, e.g. RELAY__BLOCKCHAIN__RPC_ENDPOINT,
    // RELAY__BROKER__PASSWORD
    figment = figment.merge(Env::prefixed("RELAY__").split("__"));

    let config: Config = figment.extract().map_err(Box::new)?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;
    use crate::config::Blockchain;

    #[test]
    fn defaults_fail_without_rpc_endpoint() {
        Jail::expect_with(|_jail| {
            let err = load_configuration(None).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidConfig(_)));
            Ok(())
        });
    }

    #[test]
    fn env_vars_override_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("RELAY__BLOCKCHAIN__RPC_ENDPOINT", "http://node:8545");
            jail.set_env("RELAY__BROKER__PASSWORD", "s3cret");
            let config = load_configuration(None).expect("config should load");
            assert_eq!(config.blockchain.rpc_endpoint, "http://node:8545");
            assert_eq!(config.broker.password, "s3cret");
            assert_eq!(config.blockchain.chain, Blockchain::Ethereum);
            Ok(())
        });
    }

    #[test]
    fn custom_config_file_overrides_toml_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "relay.toml",
                r#"
                [blockchain]
                rpc_endpoint = "wss://node.example:8546"

                [broker]
                exchange = "custom-exchange"
                "#,
            )?;
            let config = load_configuration(Some("relay.toml")).expect("config should load");
            assert_eq!(config.blockchain.rpc_endpoint, "wss://node.example:8546");
            assert_eq!(config.broker.exchange, "custom-exchange");
            Ok(())
        });
    }
}
