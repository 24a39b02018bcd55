//! Transport seam between a session and its socket.
//!
//! A [`Connector`] opens one connection and hands back a [`TransportHandle`]:
//! an outbound text sender and an inbound event receiver. Dropping the
//! outbound sender closes the socket.

use async_trait::async_trait;
use coinex_core::error::NetworkError;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as TungsteniteMessage;
use tracing::{debug, info, trace, warn};

/// Something that happened on the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A data frame, binary or text.
    Frame(Vec<u8>),
    /// A socket-level failure. A `Closed` event follows.
    Error(NetworkError),
    /// The socket is gone.
    Closed(Option<String>),
}

/// Both ends of one open connection.
#[derive(Debug)]
pub struct TransportHandle {
    /// Text frames to write. Dropping this closes the socket.
    pub outbound: mpsc::UnboundedSender<String>,
    /// Frames and lifecycle events read from the socket.
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens transports for a session.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a connection to `url`, failing after `connect_timeout`.
    async fn connect(
        &self,
        url: &str,
        connect_timeout: Duration,
    ) -> Result<TransportHandle, NetworkError>;
}

/// Production connector over `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(
        &self,
        url: &str,
        connect_timeout: Duration,
    ) -> Result<TransportHandle, NetworkError> {
        let (ws_stream, _response) = timeout(connect_timeout, connect_async(url))
            .await
            .map_err(|_| NetworkError::Timeout {
                timeout_ms: u64::try_from(connect_timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|e| NetworkError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        info!(url = %url, "WebSocket connected");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (sink, stream) = ws_stream.split();
        tokio::spawn(pump(sink, stream, outbound_rx, inbound_tx));

        Ok(TransportHandle {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

async fn pump<Si, St>(
    mut sink: Si,
    mut stream: St,
    mut outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
) where
    Si: futures::Sink<TungsteniteMessage> + Unpin,
    Si::Error: std::fmt::Display,
    St: futures::Stream<Item = Result<TungsteniteMessage, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    loop {
        tokio::select! {
            text = outbound.recv() => {
                let Some(text) = text else {
                    debug!("Outbound side dropped, closing socket");
                    let _ = sink.close().await;
                    break;
                };
                if let Err(e) = sink.send(TungsteniteMessage::Text(text)).await {
                    let reason = e.to_string();
                    let _ = inbound.send(TransportEvent::Error(NetworkError::websocket(reason.clone())));
                    let _ = inbound.send(TransportEvent::Closed(Some(reason)));
                    break;
                }
            }

            message = stream.next() => {
                let event = match message {
                    Some(Ok(TungsteniteMessage::Text(text))) => TransportEvent::Frame(text.into_bytes()),
                    Some(Ok(TungsteniteMessage::Binary(data))) => TransportEvent::Frame(data),
                    Some(Ok(TungsteniteMessage::Ping(data))) => {
                        if let Err(e) = sink.send(TungsteniteMessage::Pong(data)).await {
                            warn!(error = %e, "Failed to send pong");
                        }
                        continue;
                    }
                    Some(Ok(TungsteniteMessage::Pong(_) | TungsteniteMessage::Frame(_))) => {
                        trace!("Control frame ignored");
                        continue;
                    }
                    Some(Ok(TungsteniteMessage::Close(frame))) => {
                        info!("Server sent close frame");
                        let _ = inbound.send(TransportEvent::Closed(
                            frame.map(|f| format!("{} {}", u16::from(f.code), f.reason)),
                        ));
                        break;
                    }
                    Some(Err(e)) => {
                        let reason = e.to_string();
                        let _ = inbound.send(TransportEvent::Error(NetworkError::websocket(reason.clone())));
                        let _ = inbound.send(TransportEvent::Closed(Some(reason)));
                        break;
                    }
                    None => {
                        let _ = inbound.send(TransportEvent::Closed(None));
                        break;
                    }
                };
                if inbound.send(event).is_err() {
                    let _ = sink.close().await;
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory connector for session tests.

    use super::*;
    use crate::ws::message::{RequestEnvelope, tests::gzip};
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Server side of one mock connection.
    pub(crate) struct MockServer {
        pub requests: mpsc::UnboundedReceiver<String>,
        pub events: mpsc::UnboundedSender<TransportEvent>,
    }

    impl MockServer {
        pub async fn recv(&mut self) -> RequestEnvelope {
            let text = self.requests.recv().await.expect("client hung up");
            serde_json::from_str(&text).expect("request is not an envelope")
        }

        pub fn reply(&self, id: u64, code: i64, data: Value) {
            let message = if code == 0 { "OK" } else { "failed" };
            self.send_json(&json!({"id": id, "code": code, "data": data, "message": message}));
        }

        pub fn push(&self, method: &str, data: Value) {
            self.send_json(&json!({"id": null, "method": method, "data": data}));
        }

        pub fn send_json(&self, value: &Value) {
            let _ = self
                .events
                .send(TransportEvent::Frame(gzip(&value.to_string())));
        }

        pub fn send_raw(&self, bytes: Vec<u8>) {
            let _ = self.events.send(TransportEvent::Frame(bytes));
        }

        pub fn close(&self) {
            let _ = self.events.send(TransportEvent::Closed(Some("reset".to_string())));
        }

        pub fn error(&self, reason: &str) {
            let _ = self
                .events
                .send(TransportEvent::Error(NetworkError::websocket(reason)));
        }

        /// Stops reading, so further client writes fail.
        pub fn stop_reading(&mut self) {
            self.requests.close();
        }

        /// Answers `server.time` then `server.sign`, returning the sign request.
        pub async fn complete_handshake(&mut self, server_ts: i64) -> RequestEnvelope {
            let time = self.recv().await;
            assert_eq!(time.method, "server.time");
            self.reply(time.id, 0, json!({"timestamp": server_ts}));
            let sign = self.recv().await;
            assert_eq!(sign.method, "server.sign");
            self.reply(sign.id, 0, json!({}));
            sign
        }
    }

    #[derive(Default)]
    pub(crate) struct MockConnector {
        attempts: AtomicUsize,
        failures: Mutex<VecDeque<NetworkError>>,
        servers: Mutex<Option<mpsc::UnboundedSender<MockServer>>>,
    }

    impl MockConnector {
        pub fn new() -> (std::sync::Arc<Self>, mpsc::UnboundedReceiver<MockServer>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let connector = Self {
                servers: Mutex::new(Some(tx)),
                ..Self::default()
            };
            (std::sync::Arc::new(connector), rx)
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        pub fn fail_next(&self, error: NetworkError) {
            self.failures.lock().push_back(error);
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(
            &self,
            _url: &str,
            _connect_timeout: Duration,
        ) -> Result<TransportHandle, NetworkError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.failures.lock().pop_front() {
                return Err(error);
            }

            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            if let Some(servers) = self.servers.lock().as_ref() {
                let _ = servers.send(MockServer {
                    requests: outbound_rx,
                    events: inbound_tx,
                });
            }
            Ok(TransportHandle {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })
        }
    }
}
