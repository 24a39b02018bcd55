//! Client configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! api_key: "your_access_id"
//! secret_key: "your_secret"
//! auto_connect: true
//! auto_reconnect: true
//! ws:
//!   spot_url: "wss://socket.coinex.com/v2/spot"
//!   futures_url: "wss://socket.coinex.com/v2/futures"
//!   reconnect_delay_ms: 1000
//!   ping_interval_ms: 10000
//!   request_timeout_ms: 10000
//! rest:
//!   base_url: "https://api.coinex.com/v2"
//!   timeout_ms: 10000
//! ```

use super::traits::{Configurable, Validatable};
use super::validation::{EnvOverride, ValidationContext, Validator};
use crate::credentials::{Credentials, SecretKey};
use crate::error::ConfigError;
use crate::segment::{FUTURES_WS_URL, SPOT_WS_URL, Segment};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default REST base URL.
pub const REST_BASE_URL: &str = "https://api.coinex.com/v2";

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinExConfig {
    /// Access id used for `server.sign` and `X-COINEX-KEY`.
    #[serde(default)]
    pub api_key: String,

    /// HMAC secret. Read from files and the environment, never written back.
    #[serde(default, skip_serializing)]
    pub secret_key: SecretKey,

    /// Open both sessions as soon as the client is constructed.
    #[serde(default = "default_true")]
    pub auto_connect: bool,

    /// Reconnect after a transport close that was not requested.
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,

    /// WebSocket settings shared by both segments.
    #[serde(default)]
    pub ws: WsSettings,

    /// REST client settings.
    #[serde(default)]
    pub rest: RestSettings,
}

impl Default for CoinExConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: SecretKey::default(),
            auto_connect: true,
            auto_reconnect: true,
            ws: WsSettings::default(),
            rest: RestSettings::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl CoinExConfig {
    /// Creates a configuration with the given credentials and default settings.
    #[must_use]
    pub fn with_credentials(api_key: impl Into<String>, secret_key: impl Into<SecretKey>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            ..Self::default()
        }
    }

    /// Returns the credential pair, failing if either half is missing.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::missing_field("api_key"));
        }
        if self.secret_key.is_empty() {
            return Err(ConfigError::missing_field("secret_key"));
        }
        Ok(Credentials::new(self.api_key.clone(), self.secret_key.clone()))
    }

    /// Applies overrides read through `env`.
    pub fn apply_env_from<F>(&mut self, prefix: &str, env: &EnvOverride<F>) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        env.apply_string(&format!("{prefix}_API_KEY"), &mut self.api_key);
        env.apply_into(&format!("{prefix}_SECRET_KEY"), &mut self.secret_key);
        env.apply_bool(&format!("{prefix}_AUTO_CONNECT"), &mut self.auto_connect)?;
        env.apply_bool(&format!("{prefix}_AUTO_RECONNECT"), &mut self.auto_reconnect)?;
        self.ws.apply_env_from(prefix, env)?;
        self.rest.apply_env_from(prefix, env)
    }
}

impl Validatable for CoinExConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();

        ctx.enter("ws");
        self.ws.validate_with_context(&mut ctx);
        ctx.exit();

        ctx.enter("rest");
        self.rest.validate_with_context(&mut ctx);
        ctx.exit();

        ctx.into_result()
    }
}

impl Configurable for CoinExConfig {
    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        self.apply_env_from(prefix, &EnvOverride::process())
    }

    fn env_var_names(prefix: &str) -> Vec<String> {
        [
            "API_KEY",
            "SECRET_KEY",
            "AUTO_CONNECT",
            "AUTO_RECONNECT",
            "SPOT_URL",
            "FUTURES_URL",
            "CONNECT_TIMEOUT_MS",
            "RECONNECT_DELAY_MS",
            "PING_INTERVAL_MS",
            "REQUEST_TIMEOUT_MS",
            "REST_URL",
            "REST_TIMEOUT_MS",
        ]
        .iter()
        .map(|name| format!("{prefix}_{name}"))
        .collect()
    }
}

/// WebSocket settings shared by the spot and futures sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsSettings {
    /// Spot endpoint.
    #[serde(default = "default_spot_url")]
    pub spot_url: String,

    /// Futures endpoint.
    #[serde(default = "default_futures_url")]
    pub futures_url: String,

    /// Upper bound on opening the socket, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Fixed wait between a transport close and the next connect attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Keep-alive period while ready.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    /// Default window for request/response correlation.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Buffered events per subscriber before the slowest one lags.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_spot_url() -> String {
    SPOT_WS_URL.to_string()
}

fn default_futures_url() -> String {
    FUTURES_WS_URL.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_ping_interval_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_event_capacity() -> usize {
    1_024
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            spot_url: default_spot_url(),
            futures_url: default_futures_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            ping_interval_ms: default_ping_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl WsSettings {
    /// Returns the endpoint configured for `segment`.
    #[must_use]
    pub fn url_for(&self, segment: Segment) -> &str {
        match segment {
            Segment::Spot => &self.spot_url,
            Segment::Futures => &self.futures_url,
        }
    }

    /// Returns the reconnect delay as a Duration.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Returns the default request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        Validator::new(ctx)
            .url_with_scheme("spot_url", &self.spot_url, &["ws", "wss"])
            .url_with_scheme("futures_url", &self.futures_url, &["ws", "wss"])
            .positive("connect_timeout_ms", &self.connect_timeout_ms)
            .positive("ping_interval_ms", &self.ping_interval_ms)
            .positive("request_timeout_ms", &self.request_timeout_ms)
            .in_range("event_capacity", &self.event_capacity, &1, &65_536);
    }

    fn apply_env_from<F>(&mut self, prefix: &str, env: &EnvOverride<F>) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        env.apply_string(&format!("{prefix}_SPOT_URL"), &mut self.spot_url);
        env.apply_string(&format!("{prefix}_FUTURES_URL"), &mut self.futures_url);
        env.apply_number(
            &format!("{prefix}_CONNECT_TIMEOUT_MS"),
            &mut self.connect_timeout_ms,
        )?;
        env.apply_number(
            &format!("{prefix}_RECONNECT_DELAY_MS"),
            &mut self.reconnect_delay_ms,
        )?;
        env.apply_number(
            &format!("{prefix}_PING_INTERVAL_MS"),
            &mut self.ping_interval_ms,
        )?;
        env.apply_number(
            &format!("{prefix}_REQUEST_TIMEOUT_MS"),
            &mut self.request_timeout_ms,
        )
    }
}

/// REST client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestSettings {
    /// Base URL every path is joined onto.
    #[serde(default = "default_rest_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_rest_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_rest_url() -> String {
    REST_BASE_URL.to_string()
}

fn default_rest_timeout_ms() -> u64 {
    10_000
}

impl Default for RestSettings {
    fn default() -> Self {
        Self {
            base_url: default_rest_url(),
            timeout_ms: default_rest_timeout_ms(),
        }
    }
}

impl RestSettings {
    /// Returns the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate_with_context(&self, ctx: &mut ValidationContext) {
        Validator::new(ctx)
            .url_with_scheme("base_url", &self.base_url, &["http", "https"])
            .positive("timeout_ms", &self.timeout_ms);
    }

    fn apply_env_from<F>(&mut self, prefix: &str, env: &EnvOverride<F>) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        env.apply_string(&format!("{prefix}_REST_URL"), &mut self.base_url);
        env.apply_number(&format!("{prefix}_REST_TIMEOUT_MS"), &mut self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_defaults() {
        let config = CoinExConfig::default();
        assert!(config.auto_connect);
        assert!(config.auto_reconnect);
        assert_eq!(config.ws.reconnect_delay_ms, 1000);
        assert_eq!(config.ws.ping_interval_ms, 10_000);
        assert_eq!(config.ws.request_timeout_ms, 10_000);
        assert_eq!(config.ws.url_for(Segment::Futures), FUTURES_WS_URL);
        assert_eq!(config.rest.base_url, "https://api.coinex.com/v2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_required() {
        let config = CoinExConfig::default();
        assert_eq!(
            config.credentials(),
            Err(ConfigError::missing_field("api_key"))
        );

        let config = CoinExConfig {
            api_key: "key".to_string(),
            ..CoinExConfig::default()
        };
        assert_eq!(
            config.credentials(),
            Err(ConfigError::missing_field("secret_key"))
        );

        let config = CoinExConfig::with_credentials("key", "secret");
        assert!(config.credentials().unwrap().is_complete());
    }

    #[test]
    fn test_secret_not_serialized() {
        let config = CoinExConfig::with_credentials("key", "do-not-write");
        let yaml = ConfigLoader::serialize(&config, ConfigFormat::Yaml).unwrap();
        assert!(yaml.contains("api_key: key"));
        assert!(!yaml.contains("do-not-write"));
    }

    #[test]
    fn test_load_partial_yaml() {
        let yaml = "api_key: abc\nsecret_key: xyz\nauto_reconnect: false\nws:\n  reconnect_delay_ms: 250\n";
        let config: CoinExConfig = ConfigLoader::new()
            .load_str(yaml, ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(config.secret_key.expose(), "xyz");
        assert!(!config.auto_reconnect);
        assert!(config.auto_connect);
        assert_eq!(config.ws.reconnect_delay(), Duration::from_millis(250));
        assert_eq!(config.ws.spot_url, SPOT_WS_URL);
    }

    #[test]
    fn test_invalid_ws_url_rejected() {
        let mut config = CoinExConfig::default();
        config.ws.spot_url = "https://socket.coinex.com/v2/spot".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ws.spot_url"));
    }

    #[test]
    fn test_env_overrides() {
        let env = EnvOverride::from_fn(|name| {
            let value = match name {
                "COINEX_API_KEY" => "env-key",
                "COINEX_SECRET_KEY" => "env-secret",
                "COINEX_AUTO_RECONNECT" => "off",
                "COINEX_FUTURES_URL" => "ws://127.0.0.1:9000",
                "COINEX_PING_INTERVAL_MS" => "5000",
                "COINEX_REST_URL" => "http://127.0.0.1:8080/v2",
                _ => return None,
            };
            Some(value.to_string())
        });

        let mut config = CoinExConfig::default();
        config.apply_env_from("COINEX", &env).unwrap();

        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.secret_key.expose(), "env-secret");
        assert!(!config.auto_reconnect);
        assert_eq!(config.ws.futures_url, "ws://127.0.0.1:9000");
        assert_eq!(config.ws.ping_interval_ms, 5000);
        assert_eq!(config.rest.base_url, "http://127.0.0.1:8080/v2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_names() {
        let names = CoinExConfig::env_var_names("COINEX");
        assert!(names.contains(&"COINEX_SECRET_KEY".to_string()));
        assert!(names.contains(&"COINEX_RECONNECT_DELAY_MS".to_string()));
    }
}
