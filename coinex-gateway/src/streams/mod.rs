//! Market data and account push subscriptions.
//!
//! Every channel follows the same convention: `{channel}.subscribe` with a
//! `market_list` (or `ccy_list`) where an empty list means "all", pushes named
//! `{channel}.update`, and `{channel}.unsubscribe` with the same list shape.
//!
//! # Example
//!
//! ```ignore
//! use coinex_gateway::streams::{Channel, Streams};
//!
//! let streams = Streams::new(client.spot().clone());
//! let deals = streams.subscribe(Channel::Deals, &["BTCUSDT"], |data| {
//!     println!("{data}");
//! })?;
//! // later
//! streams.unsubscribe(deals, &["BTCUSDT"]);
//! ```

mod channel;
mod depth;

pub use channel::Channel;
pub use depth::{DEPTH_INTERVALS, DepthInterval, DepthLimit, DepthSubscription};

use crate::ws::{AuthenticatedSession, ListenerHandle, ListenerId};
use coinex_core::Segment;
use coinex_core::error::ConfigError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

/// A live channel subscription.
///
/// Pass it to [`Streams::unsubscribe`] to stop the server pushes and drop the
/// local listener.
#[derive(Debug)]
pub struct StreamSubscription {
    channel: Channel,
    request_id: Option<u64>,
    listener: ListenerHandle,
}

impl StreamSubscription {
    /// The subscribed channel.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Id of the subscribe request, `None` if it was queued until ready.
    #[must_use]
    pub fn request_id(&self) -> Option<u64> {
        self.request_id
    }

    /// Id of the local update listener.
    #[must_use]
    pub fn listener_id(&self) -> ListenerId {
        self.listener.id()
    }
}

/// Channel subscriptions over one segment's session.
#[derive(Debug, Clone)]
pub struct Streams {
    session: AuthenticatedSession,
}

impl Streams {
    /// Wraps `session`.
    #[must_use]
    pub fn new(session: AuthenticatedSession) -> Self {
        Self { session }
    }

    /// The segment of the underlying session.
    #[must_use]
    pub fn segment(&self) -> Segment {
        self.session.segment()
    }

    /// The underlying session.
    #[must_use]
    pub fn session(&self) -> &AuthenticatedSession {
        &self.session
    }

    /// Subscribes to `channel` for `list` and calls `on_update` with the
    /// `data` of every push until unsubscribed.
    pub fn subscribe<S, F>(
        &self,
        channel: Channel,
        list: &[S],
        on_update: F,
    ) -> Result<StreamSubscription, ConfigError>
    where
        S: AsRef<str>,
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let names: Vec<&str> = list.iter().map(AsRef::as_ref).collect();
        self.subscribe_with(channel, json!(names), on_update)
    }

    /// Like [`subscribe`](Self::subscribe), deserializing each update into `T`.
    ///
    /// Updates that do not fit `T` are logged and skipped.
    pub fn subscribe_as<T, S, F>(
        &self,
        channel: Channel,
        list: &[S],
        on_update: F,
    ) -> Result<StreamSubscription, ConfigError>
    where
        T: DeserializeOwned,
        S: AsRef<str>,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe(channel, list, move |data| {
            match T::deserialize(data) {
                Ok(update) => on_update(update),
                Err(e) => warn!(channel = %channel, error = %e, "Skipping malformed update"),
            }
        })
    }

    /// Subscribes to market state, delivering each entry of `state_list`
    /// separately.
    pub fn subscribe_state<T, S, F>(
        &self,
        markets: &[S],
        on_state: F,
    ) -> Result<StreamSubscription, ConfigError>
    where
        T: DeserializeOwned,
        S: AsRef<str>,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe(Channel::State, markets, move |data| {
            let Some(states) = data.get("state_list").and_then(Value::as_array) else {
                warn!("state.update without state_list");
                return;
            };
            for state in states {
                match T::deserialize(state) {
                    Ok(state) => on_state(state),
                    Err(e) => warn!(error = %e, "Skipping malformed market state"),
                }
            }
        })
    }

    /// Subscribes to order book depth for each market in `markets`.
    pub fn subscribe_depth<F>(
        &self,
        markets: &[DepthSubscription],
        on_update: F,
    ) -> Result<StreamSubscription, ConfigError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let list = serde_json::to_value(markets)
            .map_err(|e| ConfigError::invalid_value("market_list", e.to_string()))?;
        self.subscribe_with(Channel::Depth, list, on_update)
    }

    /// Sends `{channel}.unsubscribe` for `list` and removes the listener.
    ///
    /// Returns the request id, `None` if the request was queued until ready.
    pub fn unsubscribe<S: AsRef<str>>(
        &self,
        subscription: StreamSubscription,
        list: &[S],
    ) -> Option<u64> {
        let channel = subscription.channel;
        subscription.listener.remove();
        let names: Vec<&str> = list.iter().map(AsRef::as_ref).collect();
        debug!(segment = %self.segment(), channel = %channel, "Unsubscribing");
        self.session
            .send(channel.unsubscribe_method(), list_params(channel, json!(names)))
    }

    fn subscribe_with<F>(
        &self,
        channel: Channel,
        list: Value,
        on_update: F,
    ) -> Result<StreamSubscription, ConfigError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        if !channel.supports(self.segment()) {
            return Err(ConfigError::invalid_value(
                "channel",
                format!("{channel} is not available on {}", self.segment()),
            ));
        }

        let (request_id, listener) = self.session.send_and_listen(
            channel.subscribe_method(),
            list_params(channel, list),
            &channel.update_method(),
            on_update,
        );
        debug!(
            segment = %self.segment(),
            channel = %channel,
            request_id = ?request_id,
            "Subscribed"
        );
        Ok(StreamSubscription {
            channel,
            request_id,
            listener,
        })
    }
}

fn list_params(channel: Channel, list: Value) -> Value {
    let mut params = Map::new();
    params.insert(channel.list_key().to_string(), list);
    Value::Object(params)
}
