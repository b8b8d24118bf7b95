use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure raised while running an intercepted call
///
/// Interceptors observe failures but never swallow them: whatever the
/// operation (or a before-hook) raises reaches the caller unchanged.
#[derive(Debug, Error)]
pub enum Failure {
  /// A rule set rejected the call's arguments before the operation ran
  #[error(transparent)]
  Validation(#[from] ValidationFailure),

  /// The wrapped business operation itself failed
  #[error("{0}")]
  Operation(anyhow::Error),

  /// Several underlying causes collected together
  #[error("{}", first_message(.0))]
  Aggregate(Vec<Failure>),

  /// The call was cancelled before the operation returned
  #[error("Operation was cancelled")]
  Cancelled,

  /// The unit of work could not be opened or resolved
  #[error("Transaction error: {0}")]
  Transaction(#[from] TransactionError),
}

fn first_message(causes: &[Failure]) -> String {
  causes
    .first()
    .map(|cause| cause.to_string())
    .unwrap_or_default()
}

impl Failure {
  /// Wraps an error raised by a business operation
  pub fn operation<E>(error: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Failure::Operation(anyhow::Error::new(error))
  }

  /// Builds an operation failure from a plain message
  pub fn message(message: impl fmt::Display) -> Self {
    Failure::Operation(anyhow::anyhow!("{}", message))
  }

  /// Collects several causes into one failure
  pub fn aggregate(causes: impl IntoIterator<Item = Failure>) -> Self {
    Failure::Aggregate(causes.into_iter().collect())
  }

  /// Message used for log records
  ///
  /// Aggregates are flattened: every inner message, one per line.
  pub fn log_message(&self) -> String {
    match self {
      Failure::Aggregate(causes) => causes
        .iter()
        .map(Failure::log_message)
        .collect::<Vec<_>>()
        .join("\n"),
      other => other.to_string(),
    }
  }

  /// Looks for a typed error behind an operation failure
  ///
  /// For aggregates the first cause is inspected.
  pub fn downcast_ref<E>(&self) -> Option<&E>
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    match self {
      Failure::Operation(error) => error.downcast_ref::<E>(),
      Failure::Aggregate(causes) => causes.first().and_then(|cause| cause.downcast_ref::<E>()),
      _ => None,
    }
  }

  pub fn is_validation(&self) -> bool {
    matches!(self, Failure::Validation(_))
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, Failure::Cancelled)
  }
}

/// A single rule that did not hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleViolation {
  pub field: String,
  pub message: String,
}

impl RuleViolation {
  pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      field: field.into(),
      message: message.into(),
    }
  }
}

impl fmt::Display for RuleViolation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.field, self.message)
  }
}

/// Raised before the operation runs when a rule set rejects the arguments
#[derive(Debug, Clone, Error)]
#[error("Validation failed ({rule_set}): {}", join_violations(.violations))]
pub struct ValidationFailure {
  pub rule_set: String,
  pub violations: Vec<RuleViolation>,
}

fn join_violations(violations: &[RuleViolation]) -> String {
  violations
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("; ")
}

impl ValidationFailure {
  pub fn new(rule_set: impl Into<String>, violations: Vec<RuleViolation>) -> Self {
    Self {
      rule_set: rule_set.into(),
      violations,
    }
  }

  /// Failure carrying one violation
  pub fn single(
    rule_set: impl Into<String>,
    field: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self::new(rule_set, vec![RuleViolation::new(field, message)])
  }
}

/// Unit-of-work errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransactionError {
  #[error("Unknown persistence context: {0}")]
  UnknownContext(String),

  #[error("Failed to begin transaction: {0}")]
  BeginFailed(String),

  #[error("Failed to commit transaction: {0}")]
  CommitFailed(String),

  #[error("Failed to roll back transaction: {0}")]
  RollbackFailed(String),

  #[error("Transaction has already completed")]
  AlreadyCompleted,

  #[error("Transaction aborted: an enclosed call failed")]
  Aborted,
}
