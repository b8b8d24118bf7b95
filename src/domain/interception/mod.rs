//! Cross-cutting interception
//!
//! Operations are executed through a `Pipeline`: an ordered chain of
//! `Interceptor`s wrapped around a deferred continuation. Interceptors see
//! the call's target and captured arguments, may halt it before it runs,
//! and observe its success or failure without changing it.

pub mod failure;
pub mod interceptor;
pub mod invocation;
pub mod log_record;
pub mod performance;
pub mod pipeline;
pub mod ports;
pub mod transaction;

pub use failure::{Failure, RuleViolation, TransactionError, ValidationFailure};
pub use interceptor::{Interceptor, InterceptorKind, Next};
pub use invocation::{Argument, InvocationContext, MethodTarget, Outcome, Proceed};
pub use log_record::{LogParameter, LogRecord, Severity, UNKNOWN_USER};
pub use performance::{PerformanceSample, Stopwatch};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineError};
pub use ports::{
  DiagnosticSink, RequestContext, RuleSetEvaluator, StructuredLogger, UnitOfWork,
  UnitOfWorkProvider,
};
pub use transaction::{
  AmbientScope, TransactionBoundary, TransactionState, ambient_scope, ambient_unit_of_work,
  with_ambient_scope, with_ambient_unit_of_work,
};
