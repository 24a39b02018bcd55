//! Order book subscription parameters.

use coinex_core::error::ConfigError;
use serde::{Serialize, Serializer};

/// Price levels per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthLimit {
    /// 5 levels.
    L5,
    /// 10 levels.
    L10,
    /// 20 levels.
    #[default]
    L20,
    /// 50 levels.
    L50,
}

impl DepthLimit {
    /// Number of levels.
    #[must_use]
    pub const fn levels(&self) -> u8 {
        match self {
            Self::L5 => 5,
            Self::L10 => 10,
            Self::L20 => 20,
            Self::L50 => 50,
        }
    }
}

impl TryFrom<u32> for DepthLimit {
    type Error = ConfigError;

    fn try_from(levels: u32) -> Result<Self, Self::Error> {
        match levels {
            5 => Ok(Self::L5),
            10 => Ok(Self::L10),
            20 => Ok(Self::L20),
            50 => Ok(Self::L50),
            other => Err(ConfigError::invalid_value(
                "limit",
                format!("{other} is not one of 5, 10, 20, 50"),
            )),
        }
    }
}

impl Serialize for DepthLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.levels())
    }
}

/// Merge intervals accepted by the server.
pub const DEPTH_INTERVALS: [&str; 17] = [
    "0",
    "0.00000000001",
    "0.000000000001",
    "0.0000000001",
    "0.000000001",
    "0.00000001",
    "0.0000001",
    "0.000001",
    "0.00001",
    "0.0001",
    "0.001",
    "0.01",
    "0.1",
    "1",
    "10",
    "100",
    "1000",
];

/// Price merge interval, kept as the exact decimal string the server expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DepthInterval(&'static str);

impl DepthInterval {
    /// No merging.
    pub const ZERO: Self = Self("0");

    /// Validates `interval` against [`DEPTH_INTERVALS`].
    pub fn new(interval: &str) -> Result<Self, ConfigError> {
        DEPTH_INTERVALS
            .into_iter()
            .find(|known| *known == interval)
            .map(Self)
            .ok_or_else(|| {
                ConfigError::invalid_value("interval", format!("unsupported interval '{interval}'"))
            })
    }

    /// The interval as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Default for DepthInterval {
    fn default() -> Self {
        Self::ZERO
    }
}

/// One market in a `depth.subscribe` request.
///
/// Serialized as the tuple `[market, limit, interval, if_full]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthSubscription {
    /// Market name, e.g. `BTCUSDT`.
    pub market: String,
    /// Levels per side.
    pub limit: DepthLimit,
    /// Price merge interval.
    pub interval: DepthInterval,
    /// Push the full book on every update instead of deltas.
    pub if_full: bool,
}

impl DepthSubscription {
    /// Full-book subscription with 20 levels and no merging.
    #[must_use]
    pub fn new(market: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            limit: DepthLimit::default(),
            interval: DepthInterval::default(),
            if_full: true,
        }
    }

    /// Sets the level count.
    #[must_use]
    pub fn limit(mut self, limit: DepthLimit) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the merge interval.
    #[must_use]
    pub fn interval(mut self, interval: DepthInterval) -> Self {
        self.interval = interval;
        self
    }

    /// Chooses full pushes (`true`) or incremental pushes (`false`).
    #[must_use]
    pub fn if_full(mut self, if_full: bool) -> Self {
        self.if_full = if_full;
        self
    }
}

impl Serialize for DepthSubscription {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.market, self.limit, &self.interval, self.if_full).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscription_serializes_as_tuple() {
        let sub = DepthSubscription::new("BTCUSDT")
            .limit(DepthLimit::L5)
            .interval(DepthInterval::new("0.01").unwrap())
            .if_full(false);
        assert_eq!(
            serde_json::to_value(&sub).unwrap(),
            json!(["BTCUSDT", 5, "0.01", false])
        );
    }

    #[test]
    fn test_defaults() {
        let sub = DepthSubscription::new("ETHUSDT");
        assert_eq!(
            serde_json::to_value(&sub).unwrap(),
            json!(["ETHUSDT", 20, "0", true])
        );
    }

    #[test]
    fn test_invalid_interval_rejected() {
        assert!(DepthInterval::new("0.5").is_err());
        assert!(DepthInterval::new("1e-11").is_err());
        assert_eq!(DepthInterval::new("1000").unwrap().as_str(), "1000");
    }

    #[test]
    fn test_limit_from_levels() {
        assert_eq!(DepthLimit::try_from(50).unwrap(), DepthLimit::L50);
        assert!(DepthLimit::try_from(15).is_err());
    }
}
