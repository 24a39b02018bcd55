//! Configuration inspection commands.

use anyhow::Result;
use coinex_core::config::{CoinExConfig, ConfigFormat, ConfigLoader, Configurable};

use super::{ENV_PREFIX, load_config};

/// Prints the effective configuration as YAML.
///
/// The secret is never serialized; its presence is reported instead.
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded.
pub fn show(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    print!("{}", ConfigLoader::serialize(&config, ConfigFormat::Yaml)?);
    println!(
        "# secret_key: {}",
        if config.secret_key.is_empty() { "not set" } else { "set" }
    );
    Ok(())
}

/// Lists the override variables.
pub fn env() {
    for name in CoinExConfig::env_var_names(ENV_PREFIX) {
        println!("{name}");
    }
}
