use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::interception::{
  Failure, Interceptor, InterceptorKind, InvocationContext, LogRecord, RequestContext, Severity,
  StructuredLogger,
};

/// When a logging interceptor writes a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
  /// Error record when the call fails
  Exception,
  /// Info record before the call runs
  Entry,
}

/// Builds `LogRecord`s from intercepted calls and hands them to a logger
pub struct LoggingInterceptor {
  mode: LoggingMode,
  logger: Arc<dyn StructuredLogger>,
  request_context: Arc<dyn RequestContext>,
  sensitive_fields: Vec<String>,
}

impl LoggingInterceptor {
  pub fn new(
    mode: LoggingMode,
    logger: Arc<dyn StructuredLogger>,
    request_context: Arc<dyn RequestContext>,
    sensitive_fields: Vec<String>,
  ) -> Self {
    Self {
      mode,
      logger,
      request_context,
      sensitive_fields,
    }
  }

  fn record(&self, ctx: &InvocationContext) -> LogRecord {
    LogRecord::from_context(
      ctx,
      self.request_context.acting_user(),
      &self.sensitive_fields,
    )
  }

  fn emit(&self, severity: Severity, record: &LogRecord) {
    match record.to_json() {
      Ok(payload) => self.logger.log(severity, payload),
      Err(e) => tracing::error!("Failed to serialize log record for {}: {}", record.method, e),
    }
  }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
  fn name(&self) -> &str {
    match self.mode {
      LoggingMode::Exception => "exception_log",
      LoggingMode::Entry => "audit_log",
    }
  }

  fn kind(&self) -> InterceptorKind {
    InterceptorKind::Logging
  }

  async fn on_before(&self, ctx: &InvocationContext) -> Result<(), Failure> {
    if self.mode == LoggingMode::Entry {
      self.emit(Severity::Info, &self.record(ctx));
    }
    Ok(())
  }

  async fn on_exception(&self, ctx: &InvocationContext, failure: &Failure) {
    if self.mode == LoggingMode::Exception {
      let record = self.record(ctx).with_exception_message(failure.log_message());
      self.emit(Severity::Error, &record);
    }
  }
}
