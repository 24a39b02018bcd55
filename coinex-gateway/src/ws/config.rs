//! Session configuration.

use coinex_core::Segment;
use coinex_core::config::WsSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one authenticated session.
///
/// Contains the endpoint, reconnect policy, keep-alive period and the default
/// request window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// WebSocket endpoint URL.
    pub url: String,

    /// Market segment served by this endpoint.
    pub segment: Segment,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whether a transport close that was not requested triggers a reconnect.
    #[serde(default = "default_reconnect_enabled")]
    pub reconnect_enabled: bool,

    /// Fixed wait between a close and the next connect attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// `server.ping` period while ready.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    /// Default window for correlated requests.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Broadcast buffer per event subscriber.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_reconnect_enabled() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_ping_interval_ms() -> u64 {
    10_000
}

/// Shortest keep-alive period; smaller values, including zero, are raised to it.
pub const MIN_PING_INTERVAL_MS: u64 = 1_000;

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_event_capacity() -> usize {
    1_024
}

impl SessionConfig {
    /// Creates a new builder for `SessionConfig`.
    #[must_use]
    pub fn builder(segment: Segment) -> SessionConfigBuilder {
        SessionConfigBuilder::new(segment)
    }

    /// Derives a session configuration from the shared WebSocket settings.
    #[must_use]
    pub fn from_settings(settings: &WsSettings, segment: Segment, auto_reconnect: bool) -> Self {
        Self {
            url: settings.url_for(segment).to_string(),
            segment,
            connect_timeout_ms: settings.connect_timeout_ms,
            reconnect_enabled: auto_reconnect,
            reconnect_delay_ms: settings.reconnect_delay_ms,
            ping_interval_ms: settings.ping_interval_ms.max(MIN_PING_INTERVAL_MS),
            request_timeout_ms: settings.request_timeout_ms,
            event_capacity: settings.event_capacity,
        }
    }

    /// Returns the connection timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the reconnect delay as a Duration.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Returns the keep-alive period as a Duration.
    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms.max(MIN_PING_INTERVAL_MS))
    }

    /// Returns the default request window as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Builder for `SessionConfig`.
#[derive(Debug)]
pub struct SessionConfigBuilder {
    segment: Segment,
    url: Option<String>,
    connect_timeout_ms: Option<u64>,
    reconnect_enabled: Option<bool>,
    reconnect_delay_ms: Option<u64>,
    ping_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    event_capacity: Option<usize>,
}

impl SessionConfigBuilder {
    fn new(segment: Segment) -> Self {
        Self {
            segment,
            url: None,
            connect_timeout_ms: None,
            reconnect_enabled: None,
            reconnect_delay_ms: None,
            ping_interval_ms: None,
            request_timeout_ms: None,
            event_capacity: None,
        }
    }

    /// Overrides the segment's default endpoint.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(duration_ms(timeout));
        self
    }

    /// Sets whether reconnection is enabled.
    #[must_use]
    pub fn reconnect_enabled(mut self, enabled: bool) -> Self {
        self.reconnect_enabled = Some(enabled);
        self
    }

    /// Sets the reconnect delay.
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_ms = Some(duration_ms(delay));
        self
    }

    /// Sets the keep-alive period.
    #[must_use]
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval_ms = Some(duration_ms(interval));
        self
    }

    /// Sets the default request window.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(duration_ms(timeout));
        self
    }

    /// Sets the event buffer per subscriber.
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> SessionConfig {
        SessionConfig {
            url: self
                .url
                .unwrap_or_else(|| self.segment.default_ws_url().to_string()),
            segment: self.segment,
            connect_timeout_ms: self
                .connect_timeout_ms
                .unwrap_or_else(default_connect_timeout_ms),
            reconnect_enabled: self
                .reconnect_enabled
                .unwrap_or_else(default_reconnect_enabled),
            reconnect_delay_ms: self
                .reconnect_delay_ms
                .unwrap_or_else(default_reconnect_delay_ms),
            ping_interval_ms: self
                .ping_interval_ms
                .unwrap_or_else(default_ping_interval_ms)
                .max(MIN_PING_INTERVAL_MS),
            request_timeout_ms: self
                .request_timeout_ms
                .unwrap_or_else(default_request_timeout_ms),
            event_capacity: self.event_capacity.unwrap_or_else(default_event_capacity),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
