//! # CoinEx Core
//!
//! Shared building blocks for the CoinEx client crates:
//! - Error hierarchy ([`error::CoinExError`] and its domain errors)
//! - Market [`Segment`]s and their default endpoints
//! - [`Credentials`] with a zeroizing, redacted [`SecretKey`]
//! - Configuration loading with YAML/TOML/JSON support and environment overrides

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

/// Error types and handling
pub mod error;

/// Configuration management
pub mod config;

mod credentials;
mod segment;

pub use credentials::{Credentials, SecretKey};
pub use segment::{FUTURES_WS_URL, SPOT_WS_URL, Segment};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{CoinExConfig, ConfigLoader, Configurable, Validatable};
    pub use crate::error::{ApiError, CoinExError, FrameError, NetworkError, Result};
    pub use crate::{Credentials, SecretKey, Segment};
}
