//! Authenticated, self-healing session for one market segment.

use super::config::SessionConfig;
use super::events::{EventBus, ListenerHandle, SessionEvent};
use super::message::{FrameCodec, RequestEnvelope, ResponseEnvelope};
use super::pending::PendingRequests;
use super::state::{HandshakeReply, InternalState, SessionState, auth_timestamp};
use super::transport::{Connector, TransportEvent, TransportHandle, TungsteniteConnector};
use crate::clock::{Clock, SystemClock};
use crate::signer::RequestSigner;
use coinex_core::error::{ApiError, CoinExError, FrameError, NetworkError};
use coinex_core::{Credentials, Segment};
use coinex_telemetry::metrics::CoinExMetrics;
use coinex_telemetry::spans::{connection_span, session_span, ws_request_span};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Interval, MissedTickBehavior, interval_at, sleep, timeout};
use tracing::{Instrument, debug, error, info, trace, warn};

const METHOD_TIME: &str = "server.time";
const METHOD_SIGN: &str = "server.sign";
const METHOD_PING: &str = "server.ping";

/// One authenticated WebSocket session.
///
/// The session runs a driver task that owns the socket: it performs the
/// `server.time` / `server.sign` handshake, keeps the connection alive with
/// `server.ping`, and reconnects after a fixed delay until [`close`](Self::close)
/// is called. Cloning is cheap and every clone drives the same session.
///
/// # Example
///
/// ```no_run
/// use coinex_core::{Credentials, Segment};
/// use coinex_gateway::ws::{AuthenticatedSession, SessionConfig};
/// use serde_json::json;
///
/// # async fn run() -> coinex_core::error::Result<()> {
/// let config = SessionConfig::builder(Segment::Spot).build();
/// let session = AuthenticatedSession::new(config, Credentials::new("access_id", "secret"));
/// session.connect()?;
/// session.wait_ready().await?;
///
/// let reply = session.request("server.time", json!({})).await?;
/// println!("{}", reply.data);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthenticatedSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    access_id: String,
    signer: RequestSigner,
    connector: Arc<dyn Connector>,
    clock: Arc<dyn Clock>,
    state: RwLock<InternalState>,
    pending: PendingRequests,
    events: EventBus,
    ready: watch::Sender<bool>,
    connection: Mutex<Option<LiveConnection>>,
    queued: Mutex<Vec<QueuedSend>>,
    driver: Mutex<Option<DriverHandle>>,
    generation: AtomicU64,
}

struct LiveConnection {
    generation: u64,
    outbound: mpsc::UnboundedSender<String>,
}

struct QueuedSend {
    method: String,
    params: Value,
}

struct DriverHandle {
    generation: u64,
    shutdown: watch::Sender<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionEnd {
    Shutdown,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameOutcome {
    Continue,
    Ready,
    Disconnect,
}

impl std::fmt::Debug for AuthenticatedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedSession")
            .field("segment", &self.inner.config.segment)
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl AuthenticatedSession {
    /// Creates a session over `tokio-tungstenite` and the system clock.
    #[must_use]
    pub fn new(config: SessionConfig, credentials: Credentials) -> Self {
        Self::with_connector(
            config,
            credentials,
            Arc::new(TungsteniteConnector),
            Arc::new(SystemClock),
        )
    }

    /// Creates a session over a custom transport and clock.
    #[must_use]
    pub fn with_connector(
        config: SessionConfig,
        credentials: Credentials,
        connector: Arc<dyn Connector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        let events = EventBus::new(config.event_capacity);
        let Credentials {
            api_key,
            secret_key,
        } = credentials;

        Self {
            inner: Arc::new(SessionInner {
                config,
                access_id: api_key,
                signer: RequestSigner::new(secret_key),
                connector,
                clock,
                state: RwLock::new(InternalState::new()),
                pending: PendingRequests::new(),
                events,
                ready,
                connection: Mutex::new(None),
                queued: Mutex::new(Vec::new()),
                driver: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the segment this session serves.
    #[must_use]
    pub fn segment(&self) -> Segment {
        self.inner.config.segment
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.read().state
    }

    /// Returns true when the socket is open and authenticated.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.is_ready()
    }

    /// Local clock minus server clock from the last time sync.
    #[must_use]
    pub fn clock_offset_ms(&self) -> Option<i64> {
        self.inner.state.read().clock_offset_ms
    }

    /// Number of transports opened so far.
    #[must_use]
    pub fn connect_attempts(&self) -> u64 {
        self.inner.state.read().connect_attempts
    }

    /// Requests still waiting for a response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    /// Number of listeners registered for push `topic`.
    #[must_use]
    pub fn listener_count(&self, topic: &str) -> usize {
        self.inner.events.topic_listener_count(topic)
    }

    /// When the last frame arrived.
    #[must_use]
    pub fn last_message_at(&self) -> Option<Instant> {
        self.inner.state.read().last_message
    }

    /// Starts the session. A no-op while a driver is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) -> Result<(), CoinExError> {
        let mut driver = self.inner.driver.lock();
        if driver.is_some() {
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|e| NetworkError::ConnectionFailed {
            reason: format!("no Tokio runtime: {e}"),
        })?;

        self.inner.state.write().begin_connect();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let span = session_span(self.segment().as_str(), &self.inner.config.url);
        runtime.spawn(
            Arc::clone(&self.inner)
                .run(generation, shutdown_rx)
                .instrument(span),
        );

        *driver = Some(DriverHandle {
            generation,
            shutdown: shutdown_tx,
        });
        Ok(())
    }

    /// Closes the session and suppresses reconnection.
    ///
    /// In-flight requests fail with a connection-closed error.
    pub fn close(&self) {
        let driver = self.inner.driver.lock().take();
        let was_active = {
            let mut state = self.inner.state.write();
            let active = !state.state.is_inactive();
            state.mark_closed();
            self.inner.ready.send_replace(false);
            active
        };
        if let Some(driver) = driver {
            let _ = driver.shutdown.send(true);
        }
        self.inner.connection.lock().take();

        if was_active {
            info!(segment = %self.segment(), "Session closed");
            self.inner.on_disconnected("session closed");
        }
    }

    /// Waits until the session is authenticated.
    ///
    /// Waits indefinitely while the session keeps reconnecting; wrap the call
    /// in [`tokio::time::timeout`] for a bound.
    pub async fn wait_ready(&self) -> Result<(), CoinExError> {
        let mut ready = self.inner.ready.subscribe();
        let not_connected = || {
            CoinExError::from(NetworkError::NotConnected {
                segment: self.segment().to_string(),
            })
        };
        loop {
            ready
                .wait_for(|ready| *ready)
                .await
                .map(|_| ())
                .map_err(|_| not_connected())?;
            if self.inner.is_ready() {
                return Ok(());
            }
            ready.mark_unchanged();
            ready.changed().await.map_err(|_| not_connected())?;
        }
    }

    /// Fire-and-forget send.
    ///
    /// Returns the request id, or `None` when the session is not ready; the
    /// payload is then queued and sent once on the next ready event.
    pub fn send(&self, method: impl Into<String>, params: Value) -> Option<u64> {
        self.inner.send(method.into(), params)
    }

    /// Sends a request and waits for its response with the default window.
    pub async fn request(
        &self,
        method: impl Into<String>,
        params: Value,
    ) -> Result<ResponseEnvelope, CoinExError> {
        self.request_with_timeout(method, params, self.inner.config.request_timeout())
            .await
    }

    /// Sends a request and waits up to `window` for its response.
    ///
    /// The window covers waiting for readiness as well. A nonzero response
    /// code becomes an [`ApiError`]; a missing response becomes
    /// [`NetworkError::RequestTimeout`] and any late response is discarded.
    pub async fn request_with_timeout(
        &self,
        method: impl Into<String>,
        params: Value,
        window: Duration,
    ) -> Result<ResponseEnvelope, CoinExError> {
        let method = method.into();
        let segment = self.segment().as_str();
        let span = ws_request_span(segment, &method);
        let started = tokio::time::Instant::now();

        let exchange = self.exchange(&method, params, span.clone());
        match timeout(window, exchange).instrument(span).await {
            Ok(result) => {
                if result.is_ok() {
                    CoinExMetrics::request_latency(
                        segment,
                        &method,
                        started.elapsed().as_secs_f64(),
                    );
                }
                result
            }
            Err(_) => {
                CoinExMetrics::request_timeout(segment, &method);
                let timeout_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
                warn!(segment = %segment, method = %method, timeout_ms, "Request timed out");
                Err(NetworkError::RequestTimeout { method, timeout_ms }.into())
            }
        }
    }

    async fn exchange(
        &self,
        method: &str,
        params: Value,
        span: tracing::Span,
    ) -> Result<ResponseEnvelope, CoinExError> {
        self.wait_ready().await?;

        let id = self.inner.state.write().next_request_id();
        span.record("request_id", id);
        let (guard, completion) = self.inner.pending.register(id);
        self.inner
            .write_frame(&RequestEnvelope::new(id, method, params))?;
        CoinExMetrics::request_sent(self.segment().as_str(), method);
        trace!(id = guard.id(), "Awaiting response");

        completion
            .await
            .map_err(|_| CoinExError::from(NetworkError::closed("request abandoned")))?
    }

    /// Sends `method` once and calls `on_update` with the `data` of every
    /// push named `topic` until the returned handle is removed.
    ///
    /// The listener is registered before the request leaves, so the first
    /// push cannot be missed.
    pub fn send_and_listen<F>(
        &self,
        method: impl Into<String>,
        params: Value,
        topic: &str,
        on_update: F,
    ) -> (Option<u64>, ListenerHandle)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let handle = self.inner.events.listen(topic, on_update);
        let id = self.send(method, params);
        (id, handle)
    }

    /// Calls `callback` with the `data` of every push named `topic`.
    pub fn listen<F>(&self, topic: &str, callback: F) -> ListenerHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.events.listen(topic, callback)
    }

    /// Calls `callback` for every session event.
    pub fn on_event<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.inner.events.on_event(callback)
    }

    /// Returns a receiver of every session event emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }
}

impl SessionInner {
    fn segment(&self) -> &'static str {
        self.config.segment.as_str()
    }

    fn is_ready(&self) -> bool {
        self.state.read().state.is_ready()
    }

    fn send(&self, method: String, params: Value) -> Option<u64> {
        if !self.is_ready() {
            debug!(segment = %self.segment(), method = %method, "Not ready, queueing send");
            self.queued.lock().push(QueuedSend { method, params });
            return None;
        }

        let id = self.state.write().next_request_id();
        let envelope = RequestEnvelope::new(id, method, params);
        match self.write_frame(&envelope) {
            Ok(()) => Some(id),
            Err(e) => {
                warn!(segment = %self.segment(), method = %envelope.method, error = %e, "Send failed, queueing");
                self.queued.lock().push(QueuedSend {
                    method: envelope.method,
                    params: envelope.params,
                });
                None
            }
        }
    }

    fn write_frame(&self, envelope: &RequestEnvelope) -> Result<(), CoinExError> {
        let frame = FrameCodec::encode(envelope)?;
        let connection = self.connection.lock();
        let Some(connection) = connection.as_ref() else {
            return Err(NetworkError::NotConnected {
                segment: self.segment().to_string(),
            }
            .into());
        };
        connection
            .outbound
            .send(frame)
            .map_err(|_| NetworkError::closed("transport writer gone"))?;
        trace!(id = envelope.id, method = %envelope.method, "Frame sent");
        Ok(())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.driver
            .lock()
            .as_ref()
            .is_some_and(|driver| driver.generation == generation)
    }

    async fn run(self: Arc<Self>, generation: u64, mut shutdown: watch::Receiver<bool>) {
        loop {
            let attempt = {
                let mut state = self.state.write();
                if !state.mark_connecting() {
                    return;
                }
                state.connect_attempts
            };
            let span = connection_span(self.segment(), attempt);
            debug!(parent: &span, url = %self.config.url, "Opening transport");

            let opened = tokio::select! {
                biased;
                _ = shutdown.changed() => return,
                opened = self
                    .connector
                    .connect(&self.config.url, self.config.connect_timeout())
                    .instrument(span.clone()) => opened,
            };

            match opened {
                Ok(transport) => {
                    let end = self
                        .run_connection(generation, transport, &mut shutdown)
                        .instrument(span)
                        .await;
                    if end == ConnectionEnd::Shutdown {
                        return;
                    }
                }
                Err(e) => {
                    warn!(segment = %self.segment(), error = %e, "Connect failed");
                    self.events.emit(SessionEvent::Error(e.into()));
                }
            }

            if *shutdown.borrow() || !self.is_current(generation) {
                return;
            }
            self.on_disconnected("transport closed");

            if !self
                .state
                .read()
                .should_reconnect(self.config.reconnect_enabled)
            {
                break;
            }

            CoinExMetrics::reconnection(self.segment());
            info!(
                segment = %self.segment(),
                delay_ms = self.config.reconnect_delay_ms,
                "Reconnecting"
            );
            tokio::select! {
                biased;
                _ = shutdown.changed() => return,
                () = sleep(self.config.reconnect_delay()) => {}
            }
        }

        // Free the slot so a later connect() starts a fresh driver.
        let mut driver = self.driver.lock();
        if driver
            .as_ref()
            .is_some_and(|driver| driver.generation == generation)
        {
            driver.take();
        }
    }

    async fn run_connection(
        &self,
        generation: u64,
        transport: TransportHandle,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ConnectionEnd {
        let TransportHandle {
            outbound,
            mut inbound,
        } = transport;
        *self.connection.lock() = Some(LiveConnection {
            generation,
            outbound,
        });

        let time_id = {
            let mut state = self.state.write();
            let id = state.next_request_id();
            state.mark_awaiting_time(id);
            id
        };
        if let Err(e) = self.write_frame(&RequestEnvelope::new(time_id, METHOD_TIME, json!({}))) {
            self.events.emit(SessionEvent::Error(e));
            self.release_connection(generation);
            return ConnectionEnd::Dropped;
        }
        debug!(segment = %self.segment(), id = time_id, "Transport open, syncing clock");

        let mut keepalive: Option<Interval> = None;
        let end = loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break ConnectionEnd::Shutdown,
                event = inbound.recv() => match event {
                    Some(TransportEvent::Frame(bytes)) => match self.handle_frame(&bytes) {
                        FrameOutcome::Continue => {}
                        FrameOutcome::Ready => {
                            keepalive = Some(keepalive_timer(self.config.ping_interval()));
                        }
                        FrameOutcome::Disconnect => break ConnectionEnd::Dropped,
                    },
                    Some(TransportEvent::Error(e)) => {
                        warn!(segment = %self.segment(), error = %e, "Transport error");
                        self.events.emit(SessionEvent::Error(e.into()));
                    }
                    Some(TransportEvent::Closed(reason)) => {
                        info!(segment = %self.segment(), reason = ?reason, "Transport closed");
                        break ConnectionEnd::Dropped;
                    }
                    None => break ConnectionEnd::Dropped,
                },
                () = tick(&mut keepalive) => self.send_keepalive(),
            }
        };

        self.release_connection(generation);
        end
    }

    fn send_keepalive(&self) {
        let id = self.state.write().next_request_id();
        match self.write_frame(&RequestEnvelope::new(id, METHOD_PING, json!({}))) {
            Ok(()) => trace!(segment = %self.segment(), id, "Keep-alive sent"),
            Err(e) => debug!(segment = %self.segment(), error = %e, "Keep-alive dropped"),
        }
    }

    fn release_connection(&self, generation: u64) {
        let mut connection = self.connection.lock();
        if connection
            .as_ref()
            .is_some_and(|c| c.generation == generation)
        {
            connection.take();
        }
    }

    fn handle_frame(&self, bytes: &[u8]) -> FrameOutcome {
        let envelope = match FrameCodec::decode(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                let reason = match e {
                    FrameError::Decompress { .. } => "decompress",
                    _ => "parse",
                };
                CoinExMetrics::frame_dropped(self.segment(), reason);
                warn!(segment = %self.segment(), error = %e, len = bytes.len(), "Dropping malformed frame");
                return FrameOutcome::Continue;
            }
        };
        CoinExMetrics::frame_received(self.segment());

        let handshake = {
            let mut state = self.state.write();
            state.record_message();
            state.match_handshake(envelope.id)
        };
        match handshake {
            Some(HandshakeReply::Time) => self.on_time_reply(&envelope),
            Some(HandshakeReply::Auth) => self.on_auth_reply(envelope),
            None => {
                self.pending.complete(&envelope);
                self.events.dispatch(envelope);
                FrameOutcome::Continue
            }
        }
    }

    fn on_time_reply(&self, envelope: &ResponseEnvelope) -> FrameOutcome {
        let server_ms = match envelope.server_timestamp() {
            Some(server_ms) if envelope.is_success() => server_ms,
            _ => {
                let error: CoinExError = if envelope.is_success() {
                    FrameError::UnexpectedPayload {
                        method: METHOD_TIME.to_string(),
                        reason: "missing timestamp".to_string(),
                    }
                    .into()
                } else {
                    ApiError::new(envelope.code, envelope.message.clone()).into()
                };
                error!(segment = %self.segment(), error = %error, "Clock sync failed");
                self.events.emit(SessionEvent::Error(error));
                return FrameOutcome::Disconnect;
            }
        };

        let clock_offset_ms = self.clock.now_millis() - server_ms;
        let timestamp = auth_timestamp(self.clock.now_millis(), clock_offset_ms);
        let signed_str = match self.signer.sign_timestamp(timestamp) {
            Ok(signature) => signature,
            Err(e) => {
                error!(segment = %self.segment(), error = %e, "Signing failed");
                self.events.emit(SessionEvent::Error(e.into()));
                return FrameOutcome::Disconnect;
            }
        };

        let auth_id = {
            let mut state = self.state.write();
            let id = state.next_request_id();
            if !state.mark_authenticating(clock_offset_ms, id) {
                return FrameOutcome::Disconnect;
            }
            id
        };
        debug!(
            segment = %self.segment(),
            clock_offset_ms,
            timestamp,
            "Clock synced, authenticating"
        );

        let sign = RequestEnvelope::new(
            auth_id,
            METHOD_SIGN,
            json!({
                "access_id": self.access_id,
                "signed_str": signed_str,
                "timestamp": timestamp,
            }),
        );
        match self.write_frame(&sign) {
            Ok(()) => FrameOutcome::Continue,
            Err(e) => {
                self.events.emit(SessionEvent::Error(e));
                FrameOutcome::Disconnect
            }
        }
    }

    fn on_auth_reply(&self, envelope: ResponseEnvelope) -> FrameOutcome {
        if !envelope.is_success() {
            CoinExMetrics::auth_failure(self.segment(), envelope.code);
            error!(
                segment = %self.segment(),
                code = envelope.code,
                message = %envelope.message,
                "Authentication rejected"
            );
            let error = ApiError::new(envelope.code, envelope.message);
            self.events.emit(SessionEvent::Error(error.into()));
            return FrameOutcome::Disconnect;
        }

        {
            let mut state = self.state.write();
            if !state.mark_ready() {
                return FrameOutcome::Disconnect;
            }
            self.ready.send_replace(true);
        }
        CoinExMetrics::session_connected(self.segment(), true);
        info!(segment = %self.segment(), "Session authenticated");
        self.events.emit(SessionEvent::Open);
        self.flush_queued();
        FrameOutcome::Ready
    }

    fn flush_queued(&self) {
        let queued = std::mem::take(&mut *self.queued.lock());
        if !queued.is_empty() {
            debug!(segment = %self.segment(), count = queued.len(), "Flushing queued sends");
        }
        for QueuedSend { method, params } in queued {
            self.send(method, params);
        }
    }

    fn on_disconnected(&self, reason: &str) {
        {
            let mut state = self.state.write();
            state.mark_disconnected();
            self.ready.send_replace(false);
        }
        let failed = self.pending.fail_all(reason);
        CoinExMetrics::session_connected(self.segment(), false);
        info!(segment = %self.segment(), failed_requests = failed, reason, "Session down");
        self.events.emit(SessionEvent::Close);
    }
}

fn keepalive_timer(period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let mut timer = interval_at(tokio::time::Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
