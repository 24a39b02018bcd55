//! Market segments served by separate WebSocket endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default spot WebSocket endpoint.
pub const SPOT_WS_URL: &str = "wss://socket.coinex.com/v2/spot";
/// Default futures WebSocket endpoint.
pub const FUTURES_WS_URL: &str = "wss://socket.coinex.com/v2/futures";

/// A market segment. Each segment owns one authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    /// Spot market.
    Spot,
    /// Futures market.
    Futures,
}

impl Segment {
    /// Both segments, spot first.
    pub const ALL: [Self; 2] = [Self::Spot, Self::Futures];

    /// Returns the segment name used in log fields and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Futures => "futures",
        }
    }

    /// Returns the production WebSocket endpoint for this segment.
    #[must_use]
    pub const fn default_ws_url(&self) -> &'static str {
        match self {
            Self::Spot => SPOT_WS_URL,
            Self::Futures => FUTURES_WS_URL,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spot" => Ok(Self::Spot),
            "futures" | "perpetual" => Ok(Self::Futures),
            other => Err(format!("unknown segment '{other}', expected spot or futures")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls() {
        assert_eq!(Segment::Spot.default_ws_url(), "wss://socket.coinex.com/v2/spot");
        assert_eq!(
            Segment::Futures.default_ws_url(),
            "wss://socket.coinex.com/v2/futures"
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("SPOT".parse::<Segment>(), Ok(Segment::Spot));
        assert_eq!("futures".parse::<Segment>(), Ok(Segment::Futures));
        assert!("margin".parse::<Segment>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Segment::Futures).unwrap(), "\"futures\"");
    }
}
