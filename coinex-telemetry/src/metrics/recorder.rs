//! Pre-defined CoinEx client metrics.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Pre-defined metrics for the CoinEx client.
///
/// All metrics follow the naming convention: `coinex_<area>_<metric>_<unit>`
pub struct CoinExMetrics;

impl CoinExMetrics {
    /// Register all metric descriptions.
    pub fn register() {
        // Session metrics
        describe_gauge!(
            "coinex_ws_connected",
            "Session readiness (1=authenticated, 0=down)"
        );
        describe_counter!(
            "coinex_ws_reconnection_total",
            "Total number of reconnect attempts"
        );
        describe_counter!(
            "coinex_ws_auth_failure_total",
            "Total number of rejected server.sign handshakes"
        );

        // Frame metrics
        describe_counter!(
            "coinex_ws_frame_received_total",
            "Total number of decoded inbound frames"
        );
        describe_counter!(
            "coinex_ws_frame_dropped_total",
            "Total number of inbound frames dropped as malformed"
        );

        // Request metrics
        describe_counter!(
            "coinex_ws_request_total",
            "Total number of correlated WebSocket requests"
        );
        describe_counter!(
            "coinex_ws_request_timeout_total",
            "Total number of WebSocket requests that timed out"
        );
        describe_histogram!(
            "coinex_ws_request_latency_seconds",
            "WebSocket request to response latency"
        );

        // REST metrics
        describe_counter!("coinex_rest_request_total", "Total number of REST requests");
        describe_histogram!(
            "coinex_rest_request_latency_seconds",
            "REST request latency"
        );
    }

    // ==================== Session Metrics ====================

    /// Record session readiness for a segment.
    pub fn session_connected(segment: &str, connected: bool) {
        gauge!("coinex_ws_connected", "segment" => segment.to_string())
            .set(if connected { 1.0 } else { 0.0 });
    }

    /// Record a reconnect attempt.
    pub fn reconnection(segment: &str) {
        counter!("coinex_ws_reconnection_total", "segment" => segment.to_string()).increment(1);
    }

    /// Record a rejected authentication handshake.
    pub fn auth_failure(segment: &str, code: i64) {
        counter!(
            "coinex_ws_auth_failure_total",
            "segment" => segment.to_string(),
            "code" => code.to_string()
        )
        .increment(1);
    }

    // ==================== Frame Metrics ====================

    /// Record a decoded inbound frame.
    pub fn frame_received(segment: &str) {
        counter!("coinex_ws_frame_received_total", "segment" => segment.to_string()).increment(1);
    }

    /// Record a dropped inbound frame.
    pub fn frame_dropped(segment: &str, reason: &'static str) {
        counter!(
            "coinex_ws_frame_dropped_total",
            "segment" => segment.to_string(),
            "reason" => reason
        )
        .increment(1);
    }

    // ==================== Request Metrics ====================

    /// Record a correlated request leaving the session.
    pub fn request_sent(segment: &str, method: &str) {
        counter!(
            "coinex_ws_request_total",
            "segment" => segment.to_string(),
            "method" => method.to_string()
        )
        .increment(1);
    }

    /// Record a request that saw no response in its window.
    pub fn request_timeout(segment: &str, method: &str) {
        counter!(
            "coinex_ws_request_timeout_total",
            "segment" => segment.to_string(),
            "method" => method.to_string()
        )
        .increment(1);
    }

    /// Record the latency of a completed request.
    pub fn request_latency(segment: &str, method: &str, latency_seconds: f64) {
        histogram!(
            "coinex_ws_request_latency_seconds",
            "segment" => segment.to_string(),
            "method" => method.to_string()
        )
        .record(latency_seconds);
    }

    // ==================== REST Metrics ====================

    /// Record a completed REST call.
    pub fn rest_request(method: &str, path: &str, status: u16, latency_seconds: f64) {
        counter!(
            "coinex_rest_request_total",
            "method" => method.to_string(),
            "path" => path.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
        histogram!(
            "coinex_rest_request_latency_seconds",
            "method" => method.to_string(),
            "path" => path.to_string()
        )
        .record(latency_seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        CoinExMetrics::register();
        CoinExMetrics::session_connected("spot", true);
        CoinExMetrics::reconnection("spot");
        CoinExMetrics::auth_failure("futures", 25);
        CoinExMetrics::frame_received("spot");
        CoinExMetrics::frame_dropped("spot", "parse");
        CoinExMetrics::request_sent("spot", "server.time");
        CoinExMetrics::request_timeout("spot", "server.time");
        CoinExMetrics::request_latency("spot", "server.time", 0.012);
        CoinExMetrics::rest_request("GET", "time", 200, 0.05);
    }
}
