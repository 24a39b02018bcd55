//! # CoinEx Telemetry
//!
//! Logging, tracing and metrics for the CoinEx client.
//!
//! - **Structured Logging**: `tracing` with JSON or pretty output
//! - **Log Files**: rolling files through `tracing-appender`
//! - **Data Masking**: secrets and signatures are masked before they reach a writer
//! - **Metrics**: Prometheus-compatible session and request counters
//! - **Spans**: per-session and per-request spans

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

/// Logging configuration and initialization
pub mod logging;

/// Sensitive data masking
pub mod masking;

/// Span definitions for session and request tracing
pub mod spans;

/// Metrics collection and export
pub mod metrics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::logging::{LogConfig, LogFormat, LogOutput, init_logging};
    pub use crate::masking::{Sensitive, SensitiveDataMasker};
    pub use crate::metrics::{CoinExMetrics, MetricsConfig, init_metrics};
    pub use crate::spans::*;
}
