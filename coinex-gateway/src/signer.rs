//! Request signing.
//!
//! CoinEx signs with HMAC-SHA256 and a lowercase hex digest:
//! - WebSocket `server.sign`: the decimal millisecond timestamp
//! - REST: `METHOD + path (with query) + body + timestamp`

use coinex_core::SecretKey;
use coinex_core::error::NetworkError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs CoinEx requests with the account secret.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    secret: SecretKey,
}

impl RequestSigner {
    /// Creates a signer for `secret`.
    #[must_use]
    pub fn new(secret: impl Into<SecretKey>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Signs an arbitrary message and returns the hex digest.
    pub fn sign(&self, message: &str) -> Result<String, NetworkError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| NetworkError::websocket(format!("Failed to create HMAC: {e}")))?;
        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Signature for the WebSocket `server.sign` handshake.
    ///
    /// ```
    /// use coinex_gateway::signer::RequestSigner;
    ///
    /// let signer = RequestSigner::new("secret");
    /// assert_eq!(
    ///     signer.sign_timestamp(1_700_490_703_564).unwrap(),
    ///     "c35bb25e4b7bfa7602b36de3f5294367e15d2401cc4cdebc9720b9b531a37e66"
    /// );
    /// ```
    pub fn sign_timestamp(&self, timestamp_ms: i64) -> Result<String, NetworkError> {
        self.sign(&timestamp_ms.to_string())
    }

    /// Signature for a REST call. `path` includes the `/v2` prefix and query.
    pub fn sign_request(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
        timestamp_ms: i64,
    ) -> Result<String, NetworkError> {
        let message = format!(
            "{}{path}{}{timestamp_ms}",
            method.to_ascii_uppercase(),
            body.unwrap_or_default()
        );
        self.sign(&message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sha256_hex() {
        let signer = RequestSigner::new("secret");
        assert_eq!(
            signer.sign("message").unwrap(),
            "8b5f48702995c1598c573db1e21866a9b825d4a794d169d7060a03605796360b"
        );
    }

    #[test]
    fn test_sign_timestamp() {
        let signer = RequestSigner::new("secret");
        assert_eq!(
            signer.sign_timestamp(1_700_490_703_564).unwrap(),
            "c35bb25e4b7bfa7602b36de3f5294367e15d2401cc4cdebc9720b9b531a37e66"
        );
        assert_eq!(
            signer.sign_timestamp(1_700_490_703_000).unwrap(),
            "1a24fdfccdc3777dc05bc3b30fc1f58fe2554836d760fece110617a32621c567"
        );
    }

    #[test]
    fn test_sign_get_request() {
        let signer = RequestSigner::new("secret");
        let signature = signer
            .sign_request("get", "/v2/spot/market?market=BTCUSDT", None, 1_700_490_703_564)
            .unwrap();
        assert_eq!(
            signature,
            "931be01917104d4f0acc7c961ba6c716f8a68f0e46ce6b2d0016bc255d549847"
        );
    }

    #[test]
    fn test_sign_post_request() {
        let signer = RequestSigner::new("secret");
        let signature = signer
            .sign_request(
                "POST",
                "/v2/spot/order",
                Some(r#"{"market":"BTCUSDT"}"#),
                1_700_490_703_564,
            )
            .unwrap();
        assert_eq!(
            signature,
            "03ec78cb2eaf1158c39d7bad0d4bb37e46dc5c202af62c642e2b6c8daf1f514f"
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = RequestSigner::new("do-not-print");
        assert!(!format!("{signer:?}").contains("do-not-print"));
    }
}
