//! Configuration management.
//!
//! - YAML, TOML and JSON files, detected by extension
//! - Validation with section-qualified error messages
//! - Environment variable overrides (`COINEX_API_KEY`, `COINEX_SECRET_KEY`, ...)
//!
//! ```rust,no_run
//! use coinex_core::config::{CoinExConfig, ConfigLoader};
//!
//! let config: CoinExConfig = ConfigLoader::new()
//!     .with_env_prefix("COINEX")
//!     .load_file("coinex.toml")?;
//! let credentials = config.credentials()?;
//! # Ok::<(), coinex_core::error::ConfigError>(())
//! ```

mod coinex_config;
mod loader;
mod traits;
pub mod validation;

pub use coinex_config::{CoinExConfig, REST_BASE_URL, RestSettings, WsSettings};
pub use loader::{ConfigFormat, ConfigLoader};
pub use traits::{Configurable, Validatable};
pub use validation::{EnvOverride, ValidationContext, ValidationResult, Validator};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "COINEX";
