//! Metrics collection and export.
//!
//! Prometheus-compatible metrics for session health (connections,
//! reconnects, auth failures), frame throughput and drops, and request
//! latency and timeouts on both the WebSocket and REST paths.
//!
//! Recording is a no-op until a recorder is installed, so library code can
//! call [`CoinExMetrics`] unconditionally.

mod config;
mod recorder;

pub use config::MetricsConfig;
pub use recorder::CoinExMetrics;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// ```no_run
/// use coinex_telemetry::metrics::{init_metrics, MetricsConfig};
///
/// init_metrics(&MetricsConfig::default())?;
/// # Ok::<(), coinex_telemetry::metrics::MetricsError>(())
/// ```
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if METRICS_HANDLE.get().is_some() {
        return Err(MetricsError::AlreadyInitialized);
    }

    let mut builder = PrometheusBuilder::new()
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::InitializationFailed(format!("{e}")))?;

    if config.expose_endpoint {
        let addr: SocketAddr = config
            .endpoint_address
            .parse()
            .map_err(|e| MetricsError::InvalidAddress(format!("{e}")))?;
        builder = builder.with_http_listener(addr);
    }

    let handle = builder
        .install_recorder()
        .map_err(|e| MetricsError::InitializationFailed(format!("{e}")))?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    CoinExMetrics::register();

    Ok(())
}

/// Render the current metrics in Prometheus text format.
///
/// Returns an empty string if metrics were never initialized.
#[must_use]
pub fn render_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Errors that can occur during metrics initialization.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Metrics already initialized
    #[error("Metrics system already initialized")]
    AlreadyInitialized,

    /// Invalid endpoint address
    #[error("Invalid endpoint address: {0}")]
    InvalidAddress(String),

    /// Initialization failed
    #[error("Metrics initialization failed: {0}")]
    InitializationFailed(String),
}
