//! Push channels and their method names.

use coinex_core::Segment;
use coinex_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A server push topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Market state (24h ticker).
    State,
    /// Order book depth.
    Depth,
    /// Latest public trades.
    Deals,
    /// Index price.
    Index,
    /// Best bid and offer.
    Bbo,
    /// Own order updates.
    Order,
    /// Own stop order updates.
    Stop,
    /// Own fills.
    UserDeals,
    /// Balance changes.
    Balance,
    /// Position changes. Futures only.
    Position,
}

impl Channel {
    /// Every channel.
    pub const ALL: [Self; 10] = [
        Self::State,
        Self::Depth,
        Self::Deals,
        Self::Index,
        Self::Bbo,
        Self::Order,
        Self::Stop,
        Self::UserDeals,
        Self::Balance,
        Self::Position,
    ];

    /// Topic prefix used in method names.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Depth => "depth",
            Self::Deals => "deals",
            Self::Index => "index",
            Self::Bbo => "bbo",
            Self::Order => "order",
            Self::Stop => "stop",
            Self::UserDeals => "user_deals",
            Self::Balance => "balance",
            Self::Position => "position",
        }
    }

    /// `{name}.subscribe`
    #[must_use]
    pub fn subscribe_method(&self) -> String {
        format!("{}.subscribe", self.name())
    }

    /// `{name}.unsubscribe`
    #[must_use]
    pub fn unsubscribe_method(&self) -> String {
        format!("{}.unsubscribe", self.name())
    }

    /// `{name}.update`, the push method.
    #[must_use]
    pub fn update_method(&self) -> String {
        format!("{}.update", self.name())
    }

    /// Params key holding the market or asset list.
    #[must_use]
    pub const fn list_key(&self) -> &'static str {
        match self {
            Self::Balance => "ccy_list",
            _ => "market_list",
        }
    }

    /// Returns true if `segment` carries this channel.
    #[must_use]
    pub const fn supports(&self, segment: Segment) -> bool {
        !matches!((self, segment), (Self::Position, Segment::Spot))
    }

    /// Returns true for account channels that need an authenticated session.
    #[must_use]
    pub const fn is_private(&self) -> bool {
        matches!(
            self,
            Self::Order | Self::Stop | Self::UserDeals | Self::Balance | Self::Position
        )
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|channel| channel.name() == wanted)
            .ok_or_else(|| ConfigError::invalid_value("channel", format!("unknown channel '{s}'")))
    }
}
