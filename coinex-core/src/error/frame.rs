//! Frame codec error types.
//!
//! A malformed inbound frame never tears down a session. The session logs
//! the error, counts it and drops the frame.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while decoding or encoding WebSocket frames.
///
/// # Examples
///
/// ```
/// use coinex_core::error::FrameError;
///
/// let error = FrameError::Parse {
///     reason: "expected value at line 1 column 1".to_string(),
/// };
/// assert!(error.to_string().contains("Malformed frame"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameError {
    /// The compressed payload could not be inflated.
    #[error("[Frame] Malformed frame, decompression failed: {reason}")]
    Decompress {
        /// Reason reported by the decompressor.
        reason: String,
    },

    /// The payload was not a valid response envelope.
    #[error("[Frame] Malformed frame, parse failed: {reason}")]
    Parse {
        /// Reason reported by the JSON parser.
        reason: String,
    },

    /// An outbound envelope could not be serialized.
    #[error("[Frame] Encode failed: {reason}")]
    Encode {
        /// Reason reported by the serializer.
        reason: String,
    },

    /// A push payload did not match the requested shape.
    #[error("[Frame] Unexpected payload for '{method}': {reason}")]
    UnexpectedPayload {
        /// Push method the payload arrived on.
        method: String,
        /// Reason reported by the deserializer.
        reason: String,
    },
}

impl FrameError {
    /// Returns true if this error is recoverable.
    ///
    /// Inbound frame errors only cost the frame itself.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Encode { .. })
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::Decompress { .. } | Self::Parse { .. } | Self::UnexpectedPayload { .. } => {
                ErrorSeverity::Warning
            }
            Self::Encode { .. } => ErrorSeverity::Fatal,
        }
    }

    /// Returns a suggested retry delay in milliseconds, if applicable.
    #[must_use]
    pub fn suggested_retry_delay_ms(&self) -> Option<u64> {
        None
    }

    /// Returns true if this error came from an inbound frame.
    #[must_use]
    pub fn is_malformed_frame(&self) -> bool {
        matches!(self, Self::Decompress { .. } | Self::Parse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_frame_kinds() {
        let decompress = FrameError::Decompress {
            reason: "invalid gzip header".to_string(),
        };
        let parse = FrameError::Parse {
            reason: "EOF".to_string(),
        };
        assert!(decompress.is_malformed_frame());
        assert!(parse.is_malformed_frame());
        assert!(decompress.is_recoverable());
    }

    #[test]
    fn test_encode_is_fatal() {
        let error = FrameError::Encode {
            reason: "key must be a string".to_string(),
        };
        assert!(!error.is_malformed_frame());
        assert!(error.severity().is_fatal());
    }
}
