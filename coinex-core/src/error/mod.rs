//! Error types and handling framework.
//!
//! The hierarchy mirrors the ways a CoinEx client can fail:
//! - [`CoinExError`] - Top-level error type
//!   - [`NetworkError`] - Transport, connection loss and request timeouts
//!   - [`ApiError`] - Nonzero response codes from the exchange
//!   - [`FrameError`] - Malformed inbound frames and encode failures
//!   - [`ConfigError`] - Configuration loading and validation
//!
//! ```
//! use coinex_core::error::{CoinExError, NetworkError};
//!
//! let error: CoinExError = NetworkError::Timeout { timeout_ms: 5000 }.into();
//! assert!(error.is_recoverable());
//! assert_eq!(error.category(), "network");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error severity levels for categorizing errors.
///
/// # Examples
///
/// ```
/// use coinex_core::error::ErrorSeverity;
///
/// let severity = ErrorSeverity::Recoverable;
/// assert!(severity.is_recoverable());
/// assert!(!severity.is_fatal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// The operation cannot succeed without operator intervention.
    Fatal,

    /// The operation failed but may succeed on retry.
    #[default]
    Recoverable,

    /// Non-critical issue that should be logged.
    Warning,

    /// Expected condition, worth noting.
    Info,
}

impl ErrorSeverity {
    /// Returns true if this error is recoverable (not fatal).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Fatal)
    }

    /// Returns true if this error is fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Returns the severity as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Recoverable => "RECOVERABLE",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

mod api;
mod config;
mod frame;
mod network;

pub use api::{ApiError, CODE_RATE_LIMITED, CODE_SERVICE_BUSY, CODE_SERVICE_UNAVAILABLE};
pub use config::ConfigError;
pub use frame::FrameError;
pub use network::NetworkError;

/// Top-level error type for the CoinEx client.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinExError {
    /// Network-related error.
    #[error("{0}")]
    Network(#[from] NetworkError),

    /// Exchange API error.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Frame codec error.
    #[error("{0}")]
    Frame(#[from] FrameError),

    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl CoinExError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Network(e) => e.severity(),
            Self::Api(e) => e.severity(),
            Self::Frame(e) => e.severity(),
            Self::Config(e) => e.severity(),
        }
    }

    /// Returns true if this error is recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_recoverable(),
            Self::Api(e) => e.is_recoverable(),
            Self::Frame(e) => e.is_recoverable(),
            Self::Config(e) => e.is_recoverable(),
        }
    }

    /// Returns a suggested retry delay in milliseconds, if applicable.
    #[must_use]
    pub fn suggested_retry_delay_ms(&self) -> Option<u64> {
        match self {
            Self::Network(e) => e.suggested_retry_delay_ms(),
            Self::Api(e) => e.suggested_retry_delay_ms(),
            Self::Frame(e) => e.suggested_retry_delay_ms(),
            Self::Config(e) => e.suggested_retry_delay_ms(),
        }
    }

    /// Returns the error category as a string.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Api(_) => "api",
            Self::Frame(_) => "frame",
            Self::Config(_) => "config",
        }
    }

    /// Returns true if no response arrived within the request window.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Network(NetworkError::RequestTimeout { .. } | NetworkError::Timeout { .. })
        )
    }

    /// Returns the inner network error, if this is a network error.
    #[must_use]
    pub fn as_network_error(&self) -> Option<&NetworkError> {
        match self {
            Self::Network(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the inner API error, if this is an API error.
    #[must_use]
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the inner frame error, if this is a frame error.
    #[must_use]
    pub fn as_frame_error(&self) -> Option<&FrameError> {
        match self {
            Self::Frame(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the inner config error, if this is a config error.
    #[must_use]
    pub fn as_config_error(&self) -> Option<&ConfigError> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// A specialized Result type for CoinEx operations.
pub type Result<T> = std::result::Result<T, CoinExError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity_display() {
        assert_eq!(ErrorSeverity::Fatal.to_string(), "FATAL");
        assert_eq!(ErrorSeverity::Recoverable.to_string(), "RECOVERABLE");
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARNING");
        assert_eq!(ErrorSeverity::Info.to_string(), "INFO");
    }

    #[test]
    fn test_network_error_conversion() {
        let network_err = NetworkError::Timeout { timeout_ms: 5000 };
        let err: CoinExError = network_err.clone().into();
        assert_eq!(err.category(), "network");
        assert_eq!(err.as_network_error(), Some(&network_err));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_api_error_conversion() {
        let api_err = ApiError::new(CODE_RATE_LIMITED, "rate limit");
        let err: CoinExError = api_err.clone().into();
        assert_eq!(err.category(), "api");
        assert_eq!(err.as_api_error(), Some(&api_err));
        assert_eq!(err.suggested_retry_delay_ms(), Some(1000));
        assert!(err.as_network_error().is_none());
    }

    #[test]
    fn test_frame_error_conversion() {
        let err: CoinExError = FrameError::Parse {
            reason: "EOF".to_string(),
        }
        .into();
        assert_eq!(err.category(), "frame");
        assert!(err.as_frame_error().is_some());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_config_error_not_recoverable() {
        let err: CoinExError = ConfigError::missing_field("api_key").into();
        assert!(!err.is_recoverable());
        assert!(err.as_config_error().is_some());
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = CoinExError::Network(NetworkError::RequestTimeout {
            method: "server.ping".to_string(),
            timeout_ms: 3000,
        });
        let json = serde_json::to_string(&err).unwrap();
        let parsed: CoinExError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, parsed);
    }
}
