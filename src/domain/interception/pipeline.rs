use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::failure::Failure;
use super::interceptor::{Interceptor, InterceptorKind, Next};
use super::invocation::{InvocationContext, Proceed};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
  #[error("Transaction interceptor '{interceptor}' must wrap '{inner}', not sit inside it")]
  TransactionNotOutermost { interceptor: String, inner: String },
}

/// Ordered interceptor chain applied around one kind of operation
///
/// The first interceptor is the outermost: its before-hook runs first and
/// its after/exception hook runs last.
#[derive(Clone, Default)]
pub struct Pipeline {
  interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Pipeline {
  pub fn builder() -> PipelineBuilder {
    PipelineBuilder::default()
  }

  /// Pipeline with no interceptors; calls go straight to the operation
  pub fn passthrough() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.interceptors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.interceptors.is_empty()
  }

  pub fn names(&self) -> Vec<&str> {
    self.interceptors.iter().map(|i| i.name()).collect()
  }

  /// Runs `operation` inside the interceptor chain
  pub async fn execute<'a, T, F>(&'a self, ctx: InvocationContext, operation: F) -> Result<T, Failure>
  where
    T: Send + 'static,
    F: Future<Output = Result<T, Failure>> + Send + 'a,
  {
    let next = Next::new(&self.interceptors, Proceed::new(operation));
    let outcome = next.run(&ctx).await?;

    outcome.downcast::<T>().map(|value| *value).map_err(|_| {
      Failure::message(format!(
        "Interceptor chain for {} produced an unexpected result type",
        ctx.target()
      ))
    })
  }

  /// Like `execute`, but a cancelled token fails the operation
  ///
  /// Cancellation surfaces as `Failure::Cancelled` from the innermost
  /// position, so every interceptor sees it on the way out and
  /// transactional wrappers roll back.
  pub async fn execute_cancellable<'a, T, F>(
    &'a self,
    ctx: InvocationContext,
    cancellation: &'a CancellationToken,
    operation: F,
  ) -> Result<T, Failure>
  where
    T: Send + 'static,
    F: Future<Output = Result<T, Failure>> + Send + 'a,
  {
    let guarded = async move {
      tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(Failure::Cancelled),
        result = operation => result,
      }
    };

    self.execute(ctx, guarded).await
  }
}

#[derive(Default)]
pub struct PipelineBuilder {
  interceptors: Vec<Arc<dyn Interceptor>>,
}

impl PipelineBuilder {
  pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
    self.interceptors.push(interceptor);
    self
  }

  pub fn with_all(mut self, interceptors: impl IntoIterator<Item = Arc<dyn Interceptor>>) -> Self {
    self.interceptors.extend(interceptors);
    self
  }

  /// Finalizes the chain
  ///
  /// Rejects chains where a transaction interceptor appears after any
  /// other kind, since a failure raised outside the transaction could not
  /// roll it back.
  pub fn build(self) -> Result<Pipeline, PipelineError> {
    let mut first_non_transactional: Option<&Arc<dyn Interceptor>> = None;

    for interceptor in &self.interceptors {
      match (interceptor.kind(), first_non_transactional) {
        (InterceptorKind::Transaction, Some(inner)) => {
          return Err(PipelineError::TransactionNotOutermost {
            interceptor: interceptor.name().to_string(),
            inner: inner.name().to_string(),
          });
        }
        (InterceptorKind::Transaction, None) => {}
        (_, None) => first_non_transactional = Some(interceptor),
        (_, Some(_)) => {}
      }
    }

    Ok(Pipeline {
      interceptors: self.interceptors,
    })
  }
}
