//! Spot and futures sessions behind one handle.

use crate::streams::Streams;
use crate::ws::{AuthenticatedSession, ListenerHandle, ResponseEnvelope, SessionConfig, SessionEvent};
use coinex_core::Segment;
use coinex_core::config::{CoinExConfig, Validatable};
use coinex_core::error::{CoinExError, FrameError};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::info;

/// A session event tagged with the segment it came from.
#[derive(Debug, Clone)]
pub struct SegmentEvent {
    /// Origin session.
    pub segment: Segment,
    /// The event itself.
    pub event: SessionEvent,
}

/// Client holding one authenticated session per segment.
///
/// # Example
///
/// ```no_run
/// use coinex_core::config::CoinExConfig;
/// use coinex_gateway::CoinExWebSocket;
///
/// # async fn run() -> coinex_core::error::Result<()> {
/// let mut config = CoinExConfig::with_credentials("access_id", "secret");
/// config.auto_connect = false;
///
/// let client = CoinExWebSocket::new(&config)?;
/// client.connect().await?;
/// println!("server time {}", client.server_time().await?);
/// client.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CoinExWebSocket {
    spot: AuthenticatedSession,
    futures: AuthenticatedSession,
    events: broadcast::Sender<SegmentEvent>,
}

impl CoinExWebSocket {
    /// Builds both sessions from `config` after validating it.
    ///
    /// With `auto_connect` the sessions start immediately, which requires a
    /// Tokio runtime; await [`connect`](Self::connect) to wait for readiness.
    pub fn new(config: &CoinExConfig) -> Result<Self, CoinExError> {
        config.validate()?;
        let credentials = config.credentials()?;
        let session = |segment| {
            AuthenticatedSession::new(
                SessionConfig::from_settings(&config.ws, segment, config.auto_reconnect),
                credentials.clone(),
            )
        };
        let client = Self::with_sessions(session(Segment::Spot), session(Segment::Futures));

        info!(
            api_key = %credentials.masked_api_key(),
            auto_connect = config.auto_connect,
            auto_reconnect = config.auto_reconnect,
            "CoinEx WebSocket client created"
        );
        if config.auto_connect {
            client.spot.connect()?;
            client.futures.connect()?;
        }
        Ok(client)
    }

    /// Wraps two existing sessions.
    #[must_use]
    pub fn with_sessions(spot: AuthenticatedSession, futures: AuthenticatedSession) -> Self {
        let capacity = spot.config().event_capacity.max(futures.config().event_capacity);
        let (events, _) = broadcast::channel(capacity.max(1));

        for session in [&spot, &futures] {
            let tx = events.clone();
            let segment = session.segment();
            session.on_event(move |event| {
                let _ = tx.send(SegmentEvent {
                    segment,
                    event: event.clone(),
                });
            });
        }

        Self {
            spot,
            futures,
            events,
        }
    }

    /// Starts both sessions and waits until both are authenticated.
    ///
    /// Waits indefinitely while either keeps failing; wrap in
    /// [`tokio::time::timeout`] for a bound.
    pub async fn connect(&self) -> Result<(), CoinExError> {
        self.spot.connect()?;
        self.futures.connect()?;
        tokio::try_join!(self.spot.wait_ready(), self.futures.wait_ready())?;
        info!("Spot and futures sessions ready");
        Ok(())
    }

    /// Closes both sessions.
    pub fn close(&self) {
        self.spot.close();
        self.futures.close();
    }

    /// Returns true when both sessions are authenticated.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.spot.is_connected() && self.futures.is_connected()
    }

    /// Fire-and-forget send on the session for `segment`.
    pub fn send(&self, method: impl Into<String>, params: Value, segment: Segment) -> Option<u64> {
        self.session(segment).send(method, params)
    }

    /// The session for `segment`.
    #[must_use]
    pub fn session(&self, segment: Segment) -> &AuthenticatedSession {
        match segment {
            Segment::Spot => &self.spot,
            Segment::Futures => &self.futures,
        }
    }

    /// The spot session.
    #[must_use]
    pub fn spot(&self) -> &AuthenticatedSession {
        &self.spot
    }

    /// The futures session.
    #[must_use]
    pub fn futures(&self) -> &AuthenticatedSession {
        &self.futures
    }

    /// Channel subscriptions on the spot session.
    #[must_use]
    pub fn spot_streams(&self) -> Streams {
        Streams::new(self.spot.clone())
    }

    /// Channel subscriptions on the futures session.
    #[must_use]
    pub fn futures_streams(&self) -> Streams {
        Streams::new(self.futures.clone())
    }

    /// Receives every event of both sessions, tagged with its segment.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SegmentEvent> {
        self.events.subscribe()
    }

    /// Calls `callback` for every event of both sessions.
    ///
    /// Returns one handle per session.
    pub fn on_event<F>(&self, callback: F) -> [ListenerHandle; 2]
    where
        F: Fn(Segment, &SessionEvent) + Clone + Send + Sync + 'static,
    {
        [&self.spot, &self.futures].map(|session| {
            let segment = session.segment();
            let callback = callback.clone();
            session.on_event(move |event| callback(segment, event))
        })
    }

    /// `server.ping` on the spot session.
    pub async fn ping(&self) -> Result<ResponseEnvelope, CoinExError> {
        self.spot.request("server.ping", json!({})).await
    }

    /// `server.time` on the spot session, in Unix milliseconds.
    pub async fn server_time(&self) -> Result<i64, CoinExError> {
        let response = self.spot.request("server.time", json!({})).await?;
        response.server_timestamp().ok_or_else(|| {
            FrameError::UnexpectedPayload {
                method: "server.time".to_string(),
                reason: "missing timestamp".to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::fixed::FixedClock;
    use crate::ws::mock::{MockConnector, MockServer};
    use crate::ws::Connector;
    use coinex_core::Credentials;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const SERVER_MS: i64 = 1_700_490_703_564;

    fn session(segment: Segment) -> (AuthenticatedSession, mpsc::UnboundedReceiver<MockServer>) {
        let (connector, servers) = MockConnector::new();
        let config = SessionConfig::builder(segment)
            .ping_interval(Duration::from_secs(3_600))
            .build();
        let session = AuthenticatedSession::with_connector(
            config,
            Credentials::new("ACCESS0123456789", "secret"),
            connector as Arc<dyn Connector>,
            Arc::new(FixedClock::new(1_700_490_706_064)),
        );
        (session, servers)
    }

    fn client() -> (
        CoinExWebSocket,
        mpsc::UnboundedReceiver<MockServer>,
        mpsc::UnboundedReceiver<MockServer>,
    ) {
        let (spot, spot_servers) = session(Segment::Spot);
        let (futures, futures_servers) = session(Segment::Futures);
        (
            CoinExWebSocket::with_sessions(spot, futures),
            spot_servers,
            futures_servers,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_waits_for_both_sessions() {
        let (client, mut spot_servers, mut futures_servers) = client();
        let connecting = client.clone();
        let connect = tokio::spawn(async move { connecting.connect().await });

        let mut spot = spot_servers.recv().await.unwrap();
        spot.complete_handshake(SERVER_MS).await;
        client.spot().wait_ready().await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!connect.is_finished());
        assert!(!client.is_connected());

        let mut futures = futures_servers.recv().await.unwrap();
        futures.complete_handshake(SERVER_MS).await;
        connect.await.unwrap().unwrap();
        assert!(client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_tagged_with_segment() {
        let (client, mut spot_servers, mut futures_servers) = client();
        let mut events = client.subscribe();
        client.spot().connect().unwrap();
        client.futures().connect().unwrap();

        let mut futures = futures_servers.recv().await.unwrap();
        futures.complete_handshake(SERVER_MS).await;
        let first = events.recv().await.unwrap();
        assert_eq!(first.segment, Segment::Futures);
        assert!(matches!(first.event, SessionEvent::Open));

        let mut spot = spot_servers.recv().await.unwrap();
        spot.complete_handshake(SERVER_MS).await;
        let second = events.recv().await.unwrap();
        assert_eq!(second.segment, Segment::Spot);
        assert!(matches!(second.event, SessionEvent::Open));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_routes_by_segment_and_helpers_use_spot() {
        let (client, mut spot_servers, mut futures_servers) = client();
        let connecting = client.clone();
        let connect = tokio::spawn(async move { connecting.connect().await });
        let mut spot = spot_servers.recv().await.unwrap();
        spot.complete_handshake(SERVER_MS).await;
        let mut futures = futures_servers.recv().await.unwrap();
        futures.complete_handshake(SERVER_MS).await;
        connect.await.unwrap().unwrap();

        let id = client.send("position.subscribe", json!({"market_list": []}), Segment::Futures);
        let request = futures.recv().await;
        assert_eq!(Some(request.id), id);
        assert_eq!(request.method, "position.subscribe");

        let timing = client.clone();
        let time = tokio::spawn(async move { timing.server_time().await });
        let request = spot.recv().await;
        assert_eq!(request.method, "server.time");
        spot.reply(request.id, 0, json!({"timestamp": SERVER_MS + 5}));
        assert_eq!(time.await.unwrap().unwrap(), SERVER_MS + 5);

        let pinging = client.clone();
        let ping = tokio::spawn(async move { pinging.ping().await });
        let request = spot.recv().await;
        assert_eq!(request.method, "server.ping");
        spot.reply(request.id, 0, json!({"result": "pong"}));
        assert_eq!(ping.await.unwrap().unwrap().data["result"], "pong");
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_closes_both() {
        let (client, mut spot_servers, mut futures_servers) = client();
        let connecting = client.clone();
        let connect = tokio::spawn(async move { connecting.connect().await });
        let mut spot = spot_servers.recv().await.unwrap();
        spot.complete_handshake(SERVER_MS).await;
        let mut futures = futures_servers.recv().await.unwrap();
        futures.complete_handshake(SERVER_MS).await;
        connect.await.unwrap().unwrap();

        client.close();
        assert!(!client.spot().is_connected());
        assert!(!client.futures().is_connected());
    }

    #[test]
    fn test_new_requires_credentials() {
        let config = CoinExConfig::default();
        let err = CoinExWebSocket::new(&config).unwrap_err();
        assert!(err.as_config_error().is_some());
    }

    #[test]
    fn test_new_rejects_zero_ping_interval() {
        let mut config = CoinExConfig::with_credentials("access_id", "secret");
        config.auto_connect = false;
        config.ws.ping_interval_ms = 0;

        let err = CoinExWebSocket::new(&config).unwrap_err();
        assert!(err.as_config_error().is_some());

        config.ws.ping_interval_ms = 10_000;
        assert!(CoinExWebSocket::new(&config).is_ok());
    }
}
