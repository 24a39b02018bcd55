//! CLI command implementations.

pub mod config;
pub mod rest;
pub mod session;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use coinex_core::config::{CoinExConfig, ConfigLoader};
use tracing::debug;

/// Prefix of the environment variables that override the config file.
pub const ENV_PREFIX: &str = "COINEX";

/// Loads `path` when it exists, otherwise defaults; environment overrides
/// apply in both cases.
pub fn load_config(path: &str) -> Result<CoinExConfig> {
    let loader = ConfigLoader::new().with_env_prefix(ENV_PREFIX);

    if Path::new(path).exists() {
        loader
            .load_file(path)
            .with_context(|| format!("Failed to load config from {path}"))
    } else {
        debug!(path, "Config file not found, using defaults and environment");
        loader
            .load_env()
            .context("Failed to build config from environment")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "api_key: file_key\nauto_connect: false\nws:\n  reconnect_delay_ms: 2500"
        )
        .unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert!(!config.auto_connect);
        assert_eq!(config.ws.reconnect_delay_ms, 2500);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.ws, coinex_core::config::WsSettings::default());
    }

    #[test]
    fn test_unparsable_file_is_an_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{{ not json").unwrap();

        assert!(load_config(file.path().to_str().unwrap()).is_err());
    }
}
