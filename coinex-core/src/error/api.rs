//! Exchange API error type.
//!
//! Every CoinEx response, REST or WebSocket, carries a numeric `code`. Zero
//! means success; anything else becomes an [`ApiError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Service busy, try again later.
pub const CODE_SERVICE_BUSY: i64 = 3008;
/// Service temporarily unavailable.
pub const CODE_SERVICE_UNAVAILABLE: i64 = 4001;
/// Request rate exceeded.
pub const CODE_RATE_LIMITED: i64 = 4213;

/// A nonzero response code returned by the exchange.
///
/// # Examples
///
/// ```
/// use coinex_core::error::ApiError;
///
/// let error = ApiError::new(25, "signature error");
/// assert_eq!(error.code, 25);
/// assert!(error.to_string().contains("signature error"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("[Api] Code {code}: {message}")]
pub struct ApiError {
    /// Error code from the exchange.
    pub code: i64,
    /// Error message from the exchange.
    pub message: String,
}

impl ApiError {
    /// Creates a new API error.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Returns true if the exchange asked the caller to back off.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.code,
            CODE_SERVICE_BUSY | CODE_SERVICE_UNAVAILABLE | CODE_RATE_LIMITED
        )
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        if self.is_recoverable() {
            super::ErrorSeverity::Recoverable
        } else {
            super::ErrorSeverity::Warning
        }
    }

    /// Returns a suggested retry delay in milliseconds, if applicable.
    #[must_use]
    pub fn suggested_retry_delay_ms(&self) -> Option<u64> {
        match self.code {
            CODE_RATE_LIMITED => Some(1000),
            CODE_SERVICE_BUSY | CODE_SERVICE_UNAVAILABLE => Some(5000),
            _ => None,
        }
    }
}
