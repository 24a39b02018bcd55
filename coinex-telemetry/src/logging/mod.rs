//! Structured logging for the CoinEx client.
//!
//! - JSON and pretty formats
//! - Stdout and rolling file targets
//! - `RUST_LOG` overrides the configured level
//! - Every target is wrapped in a masking writer

mod config;
mod writer;

pub use config::{LogConfig, LogFormat, LogOutput, RotationConfig};
pub use writer::{MaskingMakeWriter, MaskingWriter};

use crate::masking::SensitiveDataMasker;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, MakeWriter, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

const LOG_FILE_PREFIX: &str = "coinex.log";

/// Initialize the global subscriber.
///
/// Returns the guards of any non-blocking file writers. Keep them alive for
/// the life of the program so buffered lines are flushed.
///
/// # Example
///
/// ```no_run
/// use coinex_telemetry::logging::{init_logging, LogConfig};
///
/// let _guards = init_logging(&LogConfig::default())?;
/// # Ok::<(), coinex_telemetry::logging::LoggingError>(())
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>, LoggingError> {
    let mut guards = Vec::new();
    let masker = Arc::new(SensitiveDataMasker::new());

    let env_filter = build_filter(&config.level)?;

    let mut layers: Vec<Box<dyn Layer<_> + Send + Sync>> = Vec::new();
    for output in &config.outputs {
        match output {
            LogOutput::Stdout => {
                let writer = MaskingMakeWriter::new(std::io::stdout, Arc::clone(&masker));
                layers.push(fmt_layer(config, writer, true));
            }
            LogOutput::File { path, rotation } => {
                std::fs::create_dir_all(path)?;
                let appender = match rotation {
                    RotationConfig::Hourly => {
                        tracing_appender::rolling::hourly(path, LOG_FILE_PREFIX)
                    }
                    RotationConfig::Daily => {
                        tracing_appender::rolling::daily(path, LOG_FILE_PREFIX)
                    }
                    RotationConfig::Never => {
                        tracing_appender::rolling::never(path, LOG_FILE_PREFIX)
                    }
                };
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                let writer = MaskingMakeWriter::new(non_blocking, Arc::clone(&masker));
                layers.push(fmt_layer(config, writer, false));
                guards.push(guard);
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guards)
}

/// Builds the event filter, preferring `RUST_LOG` over `level`.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| LoggingError::InvalidConfig(format!("bad filter '{level}': {e}")))
}

fn fmt_layer<S, W>(config: &LogConfig, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi && config.format == LogFormat::Pretty)
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info)
        .with_span_events(if config.include_span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        });

    match config.format {
        LogFormat::Json => base.json().flatten_event(true).boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create log directory
    #[error("Failed to create log directory: {0}")]
    DirectoryCreation(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid logging configuration: {0}")]
    InvalidConfig(String),

    /// A global subscriber was already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_rejects_garbage() {
        // Only meaningful when RUST_LOG is unset, which is the norm under `cargo test`.
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(build_filter("coinex_gateway=debug,info").is_ok());
            assert!(matches!(
                build_filter("coinex_gateway=loud"),
                Err(LoggingError::InvalidConfig(_))
            ));
        }
    }
}
