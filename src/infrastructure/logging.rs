use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::interception::{DiagnosticSink, PerformanceSample, Severity, StructuredLogger};
use crate::infrastructure::config::{LogFormat, LoggingConfig};

/// Installs the global tracing subscriber
///
/// `RUST_LOG` wins over the configured filter when set.
pub fn init_tracing(config: &LoggingConfig) {
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

  let registry = tracing_subscriber::registry().with(filter);
  match config.format {
    LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    LogFormat::Json => registry
      .with(tracing_subscriber::fmt::layer().json())
      .init(),
  }
}

/// Writes serialized log records as tracing events on the
/// `starterkit::audit` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStructuredLogger;

impl StructuredLogger for TracingStructuredLogger {
  fn log(&self, severity: Severity, payload: String) {
    match severity {
      Severity::Info => tracing::info!(target: "starterkit::audit", record = %payload),
      Severity::Warning => tracing::warn!(target: "starterkit::audit", record = %payload),
      Severity::Error => tracing::error!(target: "starterkit::audit", record = %payload),
    }
  }
}

/// Reports slow calls as warnings
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnosticSink;

impl DiagnosticSink for TracingDiagnosticSink {
  fn report(&self, sample: &PerformanceSample) {
    tracing::warn!(
      target: "starterkit::performance",
      method = %sample.target,
      elapsed_ms = sample.elapsed.as_millis() as u64,
      threshold_ms = sample.threshold.as_millis() as u64,
      "Performance: {} took {:.3}s",
      sample.target,
      sample.elapsed.as_secs_f64()
    );
  }
}
