use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::sync::Arc;

use super::failure::Failure;
use super::invocation::{InvocationContext, Outcome, Proceed};

/// Family an interceptor belongs to
///
/// Used by the pipeline builder to enforce that transactional wrappers
/// sit outside every other wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptorKind {
  Transaction,
  Validation,
  Logging,
  Performance,
  Custom,
}

/// Behavior wrapped around an intercepted call
///
/// Implementors usually override a subset of the three hooks. The default
/// `intercept` runs `on_before`, then the rest of the chain, then either
/// `on_after` or `on_exception`. A failing `on_before` halts the call
/// before anything further inside runs. `on_exception` observes the
/// failure; it is always re-raised afterwards.
#[async_trait]
pub trait Interceptor: Send + Sync {
  fn name(&self) -> &str;

  fn kind(&self) -> InterceptorKind {
    InterceptorKind::Custom
  }

  async fn on_before(&self, _ctx: &InvocationContext) -> Result<(), Failure> {
    Ok(())
  }

  async fn on_after(&self, _ctx: &InvocationContext) {}

  async fn on_exception(&self, _ctx: &InvocationContext, _failure: &Failure) {}

  async fn intercept(&self, ctx: &InvocationContext, next: Next<'_>) -> Result<Outcome, Failure> {
    self.on_before(ctx).await?;

    match next.run(ctx).await {
      Ok(outcome) => {
        self.on_after(ctx).await;
        Ok(outcome)
      }
      Err(failure) => {
        self.on_exception(ctx, &failure).await;
        Err(failure)
      }
    }
  }
}

/// Remainder of an interceptor chain
pub struct Next<'a> {
  chain: &'a [Arc<dyn Interceptor>],
  proceed: Proceed<'a>,
}

impl<'a> Next<'a> {
  pub fn new(chain: &'a [Arc<dyn Interceptor>], proceed: Proceed<'a>) -> Self {
    Self { chain, proceed }
  }

  /// Runs the next interceptor, or the operation itself when none remain
  pub fn run(self, ctx: &'a InvocationContext) -> BoxFuture<'a, Result<Outcome, Failure>> {
    match self.chain.split_first() {
      Some((head, rest)) => head.intercept(ctx, Next::new(rest, self.proceed)),
      None => self.proceed.run(),
    }
  }
}
