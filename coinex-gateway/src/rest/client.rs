//! REST client with CoinEx request signing.

use super::types::{MaintenanceInfo, PingResponse, SystemTime};
use crate::clock::{Clock, SystemClock};
use crate::signer::RequestSigner;
use coinex_core::Credentials;
use coinex_core::config::RestSettings;
use coinex_core::error::{ApiError, CoinExError, ConfigError, FrameError, NetworkError};
use coinex_telemetry::metrics::CoinExMetrics;
use coinex_telemetry::spans::rest_span;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, warn};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Header carrying the access id.
pub const HEADER_KEY: &str = "X-COINEX-KEY";
/// Header carrying the request signature.
pub const HEADER_SIGN: &str = "X-COINEX-SIGN";
/// Header carrying the signing timestamp.
pub const HEADER_TIMESTAMP: &str = "X-COINEX-TIMESTAMP";

/// REST client for `https://api.coinex.com/v2`.
///
/// Requests are signed unless marked [`public`](RequestBuilder::public).
/// Responses are unwrapped from the `{code, data, message}` envelope.
///
/// # Example
///
/// ```ignore
/// use coinex_gateway::rest::RestClient;
///
/// let client = RestClient::new(&settings, Some(credentials))?;
/// let time = client.system_time().await?;
/// let market: serde_json::Value = client
///     .get("spot/market")
///     .query("market", "BTCUSDT")
///     .public()
///     .send()
///     .await?;
/// ```
#[derive(Clone)]
pub struct RestClient {
    base_url: String,
    timeout_ms: u64,
    http_client: Client,
    access_id: Option<String>,
    signer: Option<RequestSigner>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("signed", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Creates a client. Without credentials only public endpoints work.
    pub fn new(
        settings: &RestSettings,
        credentials: Option<Credentials>,
    ) -> Result<Self, NetworkError> {
        let http_client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| NetworkError::ConnectionFailed {
                reason: format!("Failed to create HTTP client: {e}"),
            })?;

        let (access_id, signer) = match credentials {
            Some(credentials) if credentials.is_complete() => {
                let Credentials {
                    api_key,
                    secret_key,
                } = credentials;
                (Some(api_key), Some(RequestSigner::new(secret_key)))
            }
            _ => (None, None),
        };

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout_ms: settings.timeout_ms,
            http_client,
            access_id,
            signer,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the clock used for signing timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the base URL paths are joined onto.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns true if the client can sign private requests.
    #[must_use]
    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }

    /// Creates a GET request builder.
    #[must_use]
    pub fn get(&self, path: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::GET, path)
    }

    /// Creates a POST request builder.
    #[must_use]
    pub fn post(&self, path: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::POST, path)
    }

    /// Creates a DELETE request builder.
    #[must_use]
    pub fn delete(&self, path: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::DELETE, path)
    }

    /// Builds the full URL for `path` and its query.
    pub fn build_url(&self, path: &str, query: &[(String, String)]) -> Result<Url, NetworkError> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&joined).map_err(|e| NetworkError::Http {
            status_code: 0,
            reason: format!("Invalid URL {joined}: {e}"),
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// `GET ping`.
    pub async fn ping(&self) -> Result<PingResponse, CoinExError> {
        self.get("ping").public().send().await
    }

    /// `GET time`.
    pub async fn system_time(&self) -> Result<SystemTime, CoinExError> {
        self.get("time").public().send().await
    }

    /// `GET maintain/info`.
    pub async fn maintenance_info(&self) -> Result<Vec<MaintenanceInfo>, CoinExError> {
        self.get("maintain/info").public().send().await
    }
}

/// A request ready to go on the wire.
#[derive(Debug, Clone)]
struct PreparedRequest {
    method: Method,
    url: Url,
    body: Option<String>,
    headers: Vec<(&'static str, String)>,
}

/// Request builder for REST calls.
pub struct RequestBuilder<'a> {
    client: &'a RestClient,
    method: Method,
    path: String,
    query_params: Vec<(String, String)>,
    body: Option<Result<String, String>>,
    public: bool,
}

impl<'a> RequestBuilder<'a> {
    fn new(client: &'a RestClient, method: Method, path: &str) -> Self {
        Self {
            client,
            method,
            path: path.to_string(),
            query_params: Vec::new(),
            body: None,
            public: false,
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query_params.push((key.into(), value.to_string()));
        self
    }

    /// Adds a query parameter when `value` is present.
    #[must_use]
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn json<T: serde::Serialize>(mut self, body: &T) -> Self {
        self.body = Some(serde_json::to_string(body).map_err(|e| e.to_string()));
        self
    }

    /// Skips signing.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    fn prepare(self) -> Result<PreparedRequest, CoinExError> {
        let url = self.client.build_url(&self.path, &self.query_params)?;
        let body = self
            .body
            .transpose()
            .map_err(|reason| FrameError::Encode { reason })?;

        let mut headers = Vec::new();
        if body.is_some() {
            headers.push(("content-type", JSON_CONTENT_TYPE.to_string()));
        }

        if !self.public {
            let (Some(access_id), Some(signer)) = (&self.client.access_id, &self.client.signer)
            else {
                return Err(ConfigError::missing_field("secret_key").into());
            };
            let timestamp = self.client.clock.now_millis();
            let signed_path = match url.query() {
                Some(query) => format!("{}?{query}", url.path()),
                None => url.path().to_string(),
            };
            let signature =
                signer.sign_request(self.method.as_str(), &signed_path, body.as_deref(), timestamp)?;
            headers.push((HEADER_KEY, access_id.clone()));
            headers.push((HEADER_SIGN, signature));
            headers.push((HEADER_TIMESTAMP, timestamp.to_string()));
        }

        Ok(PreparedRequest {
            method: self.method,
            url,
            body,
            headers,
        })
    }

    /// Sends the request and deserializes the unwrapped `data`.
    pub async fn send<T: DeserializeOwned>(self) -> Result<T, CoinExError> {
        let client = self.client;
        let path = self.path.clone();
        let prepared = self.prepare()?;
        let span = rest_span(prepared.method.as_str(), &path);

        async move {
            let method = prepared.method.clone();
            debug!(url = %prepared.url, "Sending request");

            let mut request = client.http_client.request(prepared.method, prepared.url);
            for (name, value) in prepared.headers {
                request = request.header(name, value);
            }
            if let Some(body) = prepared.body {
                request = request.body(body);
            }

            let started = Instant::now();
            let response = request.send().await.map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout {
                        timeout_ms: client.timeout_ms,
                    }
                } else if e.is_connect() {
                    NetworkError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    NetworkError::Http {
                        status_code: e.status().map_or(0, |s| s.as_u16()),
                        reason: e.to_string(),
                    }
                }
            })?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| NetworkError::Http {
                status_code: status,
                reason: format!("Failed to read response: {e}"),
            })?;
            CoinExMetrics::rest_request(
                method.as_str(),
                &path,
                status,
                started.elapsed().as_secs_f64(),
            );

            let result = unwrap_envelope(&path, status, &body);
            if let Err(e) = &result {
                warn!(status, error = %e, "Request failed");
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[derive(Deserialize)]
struct RestEnvelope {
    code: i64,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: String,
}

/// Unwraps `{code, data, message}`; a nonzero code becomes an [`ApiError`].
fn unwrap_envelope<T: DeserializeOwned>(
    path: &str,
    status: u16,
    body: &str,
) -> Result<T, CoinExError> {
    let envelope = match serde_json::from_str::<RestEnvelope>(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            let reason = if (200..300).contains(&status) {
                format!("Invalid response body: {e}")
            } else {
                body.to_string()
            };
            return Err(NetworkError::Http {
                status_code: status,
                reason,
            }
            .into());
        }
    };

    if envelope.code != 0 {
        return Err(ApiError::new(envelope.code, envelope.message).into());
    }
    if !(200..300).contains(&status) {
        return Err(NetworkError::Http {
            status_code: status,
            reason: envelope.message,
        }
        .into());
    }

    serde_json::from_value(envelope.data).map_err(|e| {
        FrameError::UnexpectedPayload {
            method: path.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::fixed::FixedClock;
    use serde_json::json;

    const NOW_MS: i64 = 1_700_490_703_564;

    fn client(credentials: Option<Credentials>) -> RestClient {
        RestClient::new(&RestSettings::default(), credentials)
            .unwrap()
            .with_clock(Arc::new(FixedClock::new(NOW_MS)))
    }

    fn header<'a>(prepared: &'a PreparedRequest, name: &str) -> Option<&'a str> {
        prepared
            .headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn test_build_url() {
        let client = client(None);
        assert_eq!(client.base_url(), "https://api.coinex.com/v2");

        let url = client.build_url("/time", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.coinex.com/v2/time");

        let query = vec![("market".to_string(), "BTCUSDT".to_string())];
        let url = client.build_url("spot/market", &query).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.coinex.com/v2/spot/market?market=BTCUSDT"
        );
    }

    #[test]
    fn test_query_opt_drops_none() {
        let client = client(None);
        let builder = client
            .get("spot/deals")
            .query("market", "BTCUSDT")
            .query_opt("limit", Some(100))
            .query_opt::<i64>("last_id", None);
        assert_eq!(builder.query_params.len(), 2);
        assert_eq!(builder.query_params[1], ("limit".to_string(), "100".to_string()));
    }

    #[test]
    fn test_public_request_unsigned() {
        let client = client(None);
        let prepared = client.get("ping").public().prepare().unwrap();
        assert!(prepared.headers.is_empty());
        assert_eq!(prepared.method, Method::GET);
    }

    #[test]
    fn test_private_request_needs_credentials() {
        let client = client(None);
        let err = client.get("assets/spot/balance").prepare().unwrap_err();
        assert!(err.as_config_error().is_some());
    }

    #[test]
    fn test_signed_get_headers() {
        let client = client(Some(Credentials::new("ACCESS", "secret")));
        assert!(client.can_sign());
        let prepared = client
            .get("spot/market")
            .query("market", "BTCUSDT")
            .prepare()
            .unwrap();

        let expected = RequestSigner::new("secret")
            .sign_request("GET", "/v2/spot/market?market=BTCUSDT", None, NOW_MS)
            .unwrap();
        assert_eq!(header(&prepared, HEADER_KEY), Some("ACCESS"));
        assert_eq!(header(&prepared, HEADER_SIGN), Some(expected.as_str()));
        assert_eq!(header(&prepared, HEADER_TIMESTAMP), Some("1700490703564"));
        assert_eq!(header(&prepared, "content-type"), None);
    }

    #[test]
    fn test_signed_post_includes_body() {
        let clock = Arc::new(FixedClock::new(0));
        let client = RestClient::new(
            &RestSettings::default(),
            Some(Credentials::new("ACCESS", "secret")),
        )
        .unwrap()
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
        clock.set(NOW_MS);

        let prepared = client
            .post("spot/order")
            .json(&json!({"market": "BTCUSDT"}))
            .prepare()
            .unwrap();

        let expected = RequestSigner::new("secret")
            .sign_request(
                "POST",
                "/v2/spot/order",
                Some(r#"{"market":"BTCUSDT"}"#),
                NOW_MS,
            )
            .unwrap();
        assert_eq!(header(&prepared, HEADER_SIGN), Some(expected.as_str()));
        assert_eq!(header(&prepared, "content-type"), Some(JSON_CONTENT_TYPE));
        assert_eq!(prepared.body.as_deref(), Some(r#"{"market":"BTCUSDT"}"#));
    }

    #[test]
    fn test_unwrap_envelope_data() {
        let body = r#"{"code":0,"data":{"timestamp":1700490703564},"message":"OK"}"#;
        let time: SystemTime = unwrap_envelope("time", 200, body).unwrap();
        assert_eq!(time.timestamp, NOW_MS);

        let body = r#"{"code":0,"data":{"result":"pong"},"message":"OK"}"#;
        let ping: PingResponse = unwrap_envelope("ping", 200, body).unwrap();
        assert_eq!(ping.result, "pong");
    }

    #[test]
    fn test_unwrap_envelope_api_error() {
        let body = r#"{"code":25,"data":{},"message":"signature error"}"#;
        let err = unwrap_envelope::<Value>("spot/order", 200, body).unwrap_err();
        let api = err.as_api_error().unwrap();
        assert_eq!(api.code, 25);
        assert_eq!(api.message, "signature error");
    }

    #[test]
    fn test_unwrap_envelope_http_error() {
        let err = unwrap_envelope::<Value>("time", 502, "<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(
            err.as_network_error(),
            Some(NetworkError::Http {
                status_code: 502,
                ..
            })
        ));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unwrap_envelope_shape_mismatch() {
        let body = r#"{"code":0,"data":[],"message":"OK"}"#;
        let err = unwrap_envelope::<SystemTime>("time", 200, body).unwrap_err();
        assert!(matches!(
            err.as_frame_error(),
            Some(FrameError::UnexpectedPayload { .. })
        ));
    }
}
