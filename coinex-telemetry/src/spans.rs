//! Span definitions for session and request tracing.

use tracing::{Span, info_span};

/// Span covering the whole life of one segment's session driver.
///
/// ```
/// use coinex_telemetry::spans::session_span;
///
/// let span = session_span("spot", "wss://socket.coinex.com/v2/spot");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn session_span(segment: &str, url: &str) -> Span {
    info_span!(
        "session",
        segment = %segment,
        url = %url,
        otel.kind = "client"
    )
}

/// Span for a single connect attempt and its handshake.
#[must_use]
pub fn connection_span(segment: &str, attempt: u64) -> Span {
    info_span!("connection", segment = %segment, attempt = attempt)
}

/// Span for a correlated WebSocket request.
#[must_use]
pub fn ws_request_span(segment: &str, method: &str) -> Span {
    info_span!(
        "ws_request",
        segment = %segment,
        method = %method,
        request_id = tracing::field::Empty,
        otel.kind = "client"
    )
}

/// Span for a REST call.
#[must_use]
pub fn rest_span(method: &str, path: &str) -> Span {
    info_span!(
        "rest_api",
        method = %method,
        path = %path,
        otel.kind = "client"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_construct_without_subscriber() {
        let _ = session_span("spot", "wss://socket.coinex.com/v2/spot");
        let _ = connection_span("futures", 3);
        let span = ws_request_span("spot", "server.time");
        span.record("request_id", 7);
        let _ = rest_span("GET", "/v2/time");
    }
}
