//! Authenticated WebSocket sessions.
//!
//! Each [`AuthenticatedSession`] owns one socket to one market segment:
//! - `server.time` clock sync followed by a `server.sign` handshake
//! - `server.ping` keep-alive while ready
//! - Fixed-delay reconnection with a fresh handshake
//! - Request/response correlation by id with a bounded wait
//! - Fan-out of every decoded frame to generic and per-topic listeners
//!
//! # Example
//!
//! ```ignore
//! use coinex_gateway::ws::{AuthenticatedSession, SessionConfig, SessionEvent};
//!
//! let config = SessionConfig::builder(Segment::Spot)
//!     .reconnect_delay(Duration::from_secs(1))
//!     .build();
//!
//! let session = AuthenticatedSession::new(config, credentials);
//! session.on_event(|event| {
//!     if let SessionEvent::Open = event {
//!         println!("ready");
//!     }
//! });
//! session.connect()?;
//! ```

mod config;
mod events;
mod message;
mod pending;
mod session;
mod state;
mod transport;

pub use config::{MIN_PING_INTERVAL_MS, SessionConfig, SessionConfigBuilder};
pub use events::{ListenerHandle, ListenerId, SessionEvent};
pub use message::{FrameCodec, RequestEnvelope, ResponseEnvelope};
pub use session::AuthenticatedSession;
pub use state::SessionState;
pub use transport::{Connector, TransportEvent, TransportHandle, TungsteniteConnector};

#[cfg(test)]
pub(crate) use transport::mock;
