//! Network-related error types.
//!
//! Covers socket connection failures, WebSocket transport errors, HTTP
//! failures from the REST client and request correlation timeouts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Network error type covering transport failures, connection loss and
/// request timeouts.
///
/// # Examples
///
/// ```
/// use coinex_core::error::NetworkError;
///
/// let error = NetworkError::ConnectionFailed {
///     reason: "Connection refused".to_string(),
/// };
/// assert!(error.to_string().contains("Connection refused"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkError {
    /// Connection to the remote host failed.
    #[error("[Network] Connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for the connection failure.
        reason: String,
    },

    /// Opening the connection timed out.
    #[error("[Network] Connection timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// WebSocket transport error.
    #[error("[Network] WebSocket error: {reason}")]
    WebSocket {
        /// Reason for the WebSocket error.
        reason: String,
    },

    /// HTTP request failed.
    #[error("[Network] HTTP error: status {status_code} - {reason}")]
    Http {
        /// HTTP status code, 0 when no response was received.
        status_code: u16,
        /// Reason for the HTTP error.
        reason: String,
    },

    /// Connection was closed while work was outstanding.
    #[error("[Network] Connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for the connection closure.
        reason: String,
    },

    /// No response matched a request within its window.
    #[error("[Network] Request '{method}' timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Method name of the request.
        method: String,
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The session has no live transport.
    #[error("[Network] Not connected: {segment}")]
    NotConnected {
        /// Segment whose session is down.
        segment: String,
    },
}

impl NetworkError {
    /// Returns true if this error is recoverable (can be retried).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Http { status_code, .. } if *status_code < 500 && *status_code != 0)
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::Timeout { .. }
            | Self::ConnectionFailed { .. }
            | Self::ConnectionClosed { .. }
            | Self::WebSocket { .. }
            | Self::RequestTimeout { .. }
            | Self::NotConnected { .. } => ErrorSeverity::Recoverable,
            Self::Http { status_code, .. } if *status_code >= 500 || *status_code == 0 => {
                ErrorSeverity::Recoverable
            }
            Self::Http { .. } => ErrorSeverity::Warning,
        }
    }

    /// Returns a suggested retry delay in milliseconds, if applicable.
    #[must_use]
    pub fn suggested_retry_delay_ms(&self) -> Option<u64> {
        match self {
            Self::Timeout { timeout_ms } => Some(*timeout_ms / 2),
            Self::ConnectionFailed { .. }
            | Self::ConnectionClosed { .. }
            | Self::NotConnected { .. } => Some(1000),
            Self::WebSocket { .. } => Some(500),
            _ => None,
        }
    }

    /// Creates a WebSocket transport error.
    #[must_use]
    pub fn websocket(reason: impl Into<String>) -> Self {
        Self::WebSocket {
            reason: reason.into(),
        }
    }

    /// Creates a connection closed error.
    #[must_use]
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: reason.into(),
        }
    }
}
