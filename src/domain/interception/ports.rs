use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use super::failure::{TransactionError, ValidationFailure};
use super::invocation::Argument;
use super::log_record::Severity;
use super::performance::PerformanceSample;

/// Sink receiving serialized log records
pub trait StructuredLogger: Send + Sync {
  fn log(&self, severity: Severity, payload: String);
}

/// Unit of work opened by a `UnitOfWorkProvider`
#[async_trait]
pub trait UnitOfWork: Send + Sync {
  /// Makes the work durable
  async fn commit(&self) -> Result<(), TransactionError>;

  /// Discards the work
  async fn rollback(&self) -> Result<(), TransactionError>;

  /// Lets persistence adapters recover their concrete handle
  fn as_any(&self) -> &dyn Any;
}

/// Factory for units of work, keyed by persistence context name
#[async_trait]
pub trait UnitOfWorkProvider: Send + Sync {
  async fn begin(&self, context: &str) -> Result<Arc<dyn UnitOfWork>, TransactionError>;
}

/// Ambient information about the request being served
pub trait RequestContext: Send + Sync {
  /// Identifier of the acting user, if one is known
  fn acting_user(&self) -> Option<String>;
}

/// Evaluates named rule sets against call arguments
pub trait RuleSetEvaluator: Send + Sync {
  fn evaluate(&self, rule_set: &str, arguments: &[Argument]) -> Result<(), ValidationFailure>;
}

/// Receives performance samples that crossed their threshold
pub trait DiagnosticSink: Send + Sync {
  fn report(&self, sample: &PerformanceSample);
}
