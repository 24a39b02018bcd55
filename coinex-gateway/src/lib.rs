//! # CoinEx Gateway
//!
//! Network side of the CoinEx client.
//!
//! This crate provides:
//! - [`ws::AuthenticatedSession`]: one signed, self-healing WebSocket session
//!   per market segment
//! - [`CoinExWebSocket`]: the spot and futures sessions behind one handle
//! - [`streams`]: channel subscriptions (`state`, `depth`, `deals`, ...)
//! - [`rest::RestClient`]: signed REST calls against the v2 API
//!
//! # Example
//!
//! ```ignore
//! use coinex_gateway::prelude::*;
//!
//! let client = CoinExWebSocket::new(&config)?;
//! client.connect().await?;
//!
//! let streams = client.spot_streams();
//! streams.subscribe(Channel::Deals, &["BTCUSDT"], |data| println!("{data}"))?;
//! ```

#![warn(missing_docs)]
#![allow(clippy::all)]
#![allow(clippy::pedantic)]

/// WebSocket session infrastructure
pub mod ws;

/// REST client infrastructure
pub mod rest;

/// Channel subscriptions
pub mod streams;

/// HMAC request signing
pub mod signer;

/// Wall clock abstraction
pub mod clock;

mod client;

pub use client::{CoinExWebSocket, SegmentEvent};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::{CoinExWebSocket, SegmentEvent};
    pub use crate::rest::{RestClient, SystemTime};
    pub use crate::streams::{Channel, DepthSubscription, StreamSubscription, Streams};
    pub use crate::ws::{
        AuthenticatedSession, ListenerHandle, ResponseEnvelope, SessionConfig, SessionEvent,
        SessionState,
    };
    pub use coinex_core::{Credentials, Segment};
}
