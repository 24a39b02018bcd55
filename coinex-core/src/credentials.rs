//! API credentials with secure memory handling.
//!
//! The secret key is zeroed on drop and never printed: `Debug` and `Display`
//! both render a redacted placeholder.

use serde::Deserialize;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The HMAC secret issued with an API key.
///
/// # Example
///
/// ```
/// use coinex_core::SecretKey;
///
/// let secret = SecretKey::new("my-secret");
/// assert_eq!(secret.expose(), "my-secret");
/// assert_eq!(format!("{secret:?}"), "SecretKey([REDACTED, 9 bytes])");
/// ```
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(transparent)]
pub struct SecretKey {
    value: String,
}

impl SecretKey {
    /// Wraps a secret string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Exposes the secret for signing. Never log the returned value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Exposes the secret as raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }

    /// Returns true if no secret was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED, {} bytes])", self.value.len())
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.value.as_bytes(), other.value.as_bytes());
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl Eq for SecretKey {}

impl From<String> for SecretKey {
    fn from(value: String) -> Self {
        Self { value }
    }
}

impl From<&str> for SecretKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Access id plus secret used to sign REST requests and authenticate sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Public access id, sent as `access_id` / `X-COINEX-KEY`.
    pub api_key: String,
    /// HMAC secret.
    pub secret_key: SecretKey,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<SecretKey>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Returns true if both halves are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }

    /// The access id with its middle masked, for log lines.
    #[must_use]
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}***{tail}")
    }
}
