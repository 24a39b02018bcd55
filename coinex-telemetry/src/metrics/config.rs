//! Metrics configuration types.

use serde::{Deserialize, Serialize};

/// Configuration for the metrics system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether to expose a Prometheus HTTP endpoint
    #[serde(default)]
    pub expose_endpoint: bool,

    /// Address for the Prometheus endpoint (e.g., "127.0.0.1:9090")
    #[serde(default = "default_endpoint_address")]
    pub endpoint_address: String,

    /// Histogram buckets for latency metrics (in seconds)
    #[serde(default = "default_latency_buckets")]
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            expose_endpoint: false,
            endpoint_address: default_endpoint_address(),
            latency_buckets: default_latency_buckets(),
        }
    }
}

fn default_endpoint_address() -> String {
    "127.0.0.1:9090".to_string()
}

fn default_latency_buckets() -> Vec<f64> {
    vec![
        0.005, // 5ms
        0.01,  // 10ms
        0.025, // 25ms
        0.05,  // 50ms
        0.1,   // 100ms
        0.25,  // 250ms
        0.5,   // 500ms
        1.0,   // 1s
        2.5,   // 2.5s
        10.0,  // request timeout
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(!config.expose_endpoint);
        assert_eq!(config.endpoint_address, "127.0.0.1:9090");
        assert!(config.latency_buckets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_partial_deserialization() {
        let parsed: MetricsConfig =
            serde_json::from_str(r#"{"expose_endpoint": true}"#).unwrap();
        assert!(parsed.expose_endpoint);
        assert_eq!(parsed.endpoint_address, "127.0.0.1:9090");
    }
}
