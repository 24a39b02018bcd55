//! REST client infrastructure.
//!
//! This module provides the CoinEx v2 REST client with:
//! - Request signing through `X-COINEX-*` headers
//! - `{code, data, message}` envelope unwrapping
//! - Public helpers for ping, system time and maintenance windows
//!
//! # Example
//!
//! ```ignore
//! use coinex_gateway::rest::RestClient;
//!
//! let client = RestClient::new(&config.rest, Some(config.credentials()?))?;
//! let balances: serde_json::Value = client.get("assets/spot/balance").send().await?;
//! ```

mod client;
mod types;

pub use client::{HEADER_KEY, HEADER_SIGN, HEADER_TIMESTAMP, RequestBuilder, RestClient};
pub use types::{MaintenanceInfo, MaintenanceScope, PingResponse, SystemTime};
