//! Session state machine.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Lifecycle state of an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// No transport.
    #[default]
    Idle,
    /// Transport opening.
    Connecting,
    /// Socket open, `server.time` outstanding.
    AwaitingTime,
    /// Clock synced, `server.sign` outstanding.
    Authenticating,
    /// Authenticated; keep-alive running.
    Ready,
    /// Closed by the caller.
    Closed,
}

impl SessionState {
    /// Returns true once the session is authenticated.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns true while the handshake is in progress.
    #[must_use]
    pub fn is_handshaking(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::AwaitingTime | Self::Authenticating
        )
    }

    /// Returns true when no transport is held.
    #[must_use]
    pub fn is_inactive(&self) -> bool {
        matches!(self, Self::Idle | Self::Closed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::AwaitingTime => write!(f, "AwaitingTime"),
            Self::Authenticating => write!(f, "Authenticating"),
            Self::Ready => write!(f, "Ready"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Which handshake step an inbound id answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandshakeReply {
    Time,
    Auth,
}

/// Mutable session bookkeeping, guarded by the session's lock.
#[derive(Debug, Default)]
pub(crate) struct InternalState {
    pub state: SessionState,
    /// Local clock minus server clock, in milliseconds.
    pub clock_offset_ms: Option<i64>,
    /// Last id handed out on the current connection.
    pub last_request_id: u64,
    pub time_request_id: Option<u64>,
    pub auth_request_id: Option<u64>,
    pub explicitly_closed: bool,
    pub connect_attempts: u64,
    pub last_message: Option<Instant>,
}

impl InternalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caller asked for a connection; clears the explicit-close flag.
    pub fn begin_connect(&mut self) {
        self.explicitly_closed = false;
        self.state = SessionState::Connecting;
    }

    /// A new transport is being opened. Refused once closed.
    pub fn mark_connecting(&mut self) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        self.state = SessionState::Connecting;
        self.connect_attempts += 1;
        true
    }

    /// Ids restart at 1 on every connection.
    pub fn next_request_id(&mut self) -> u64 {
        self.last_request_id += 1;
        self.last_request_id
    }

    /// `server.time` went out with `id`.
    pub fn mark_awaiting_time(&mut self, id: u64) -> bool {
        if self.state != SessionState::Connecting {
            return false;
        }
        self.state = SessionState::AwaitingTime;
        self.time_request_id = Some(id);
        true
    }

    /// Clock synced and `server.sign` went out with `auth_id`.
    pub fn mark_authenticating(&mut self, clock_offset_ms: i64, auth_id: u64) -> bool {
        if self.state != SessionState::AwaitingTime {
            return false;
        }
        self.state = SessionState::Authenticating;
        self.clock_offset_ms = Some(clock_offset_ms);
        self.time_request_id = None;
        self.auth_request_id = Some(auth_id);
        true
    }

    pub fn mark_ready(&mut self) -> bool {
        if self.state != SessionState::Authenticating {
            return false;
        }
        self.state = SessionState::Ready;
        self.auth_request_id = None;
        true
    }

    /// Transport went away; everything tied to the connection is reset.
    /// A closed session stays closed.
    pub fn mark_disconnected(&mut self) {
        if self.state != SessionState::Closed {
            self.state = SessionState::Idle;
        }
        self.clock_offset_ms = None;
        self.last_request_id = 0;
        self.time_request_id = None;
        self.auth_request_id = None;
    }

    pub fn mark_closed(&mut self) {
        self.mark_disconnected();
        self.explicitly_closed = true;
        self.state = SessionState::Closed;
    }

    pub fn record_message(&mut self) {
        self.last_message = Some(Instant::now());
    }

    /// Claims `id` if it answers an outstanding handshake request.
    pub fn match_handshake(&self, id: u64) -> Option<HandshakeReply> {
        if id == 0 {
            return None;
        }
        if self.time_request_id == Some(id) {
            Some(HandshakeReply::Time)
        } else if self.auth_request_id == Some(id) {
            Some(HandshakeReply::Auth)
        } else {
            None
        }
    }

    pub fn should_reconnect(&self, reconnect_enabled: bool) -> bool {
        reconnect_enabled && !self.explicitly_closed
    }
}

/// Auth timestamp: the synced clock truncated to the whole second.
pub(crate) fn auth_timestamp(local_now_ms: i64, clock_offset_ms: i64) -> i64 {
    (local_now_ms - clock_offset_ms).div_euclid(1000) * 1000
}
