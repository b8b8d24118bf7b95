use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::interception::{
  AmbientScope, Failure, Interceptor, InterceptorKind, InvocationContext, Next, Outcome,
  TransactionBoundary, TransactionError, TransactionState, UnitOfWorkProvider, ambient_scope,
  with_ambient_scope, with_ambient_unit_of_work,
};

/// How a transaction interceptor scopes its unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStrategy {
  /// One scope per logical flow; nested transactional calls join it.
  /// Commit on success, rollback on failure. A failed nested call dooms
  /// the scope, so the outermost call rolls back even if it recovered.
  AmbientScope,
  /// Always opens its own transaction on the named context, commits on
  /// success and then attempts a rollback during cleanup whatever the
  /// outcome. After a successful commit that rollback is expected to fail;
  /// the error is logged at warn level and not raised.
  ContextBound,
}

/// Wraps the rest of the chain in a unit of work
pub struct TransactionInterceptor {
  provider: Arc<dyn UnitOfWorkProvider>,
  context: String,
  strategy: TransactionStrategy,
}

impl TransactionInterceptor {
  pub fn new(
    provider: Arc<dyn UnitOfWorkProvider>,
    context: impl Into<String>,
    strategy: TransactionStrategy,
  ) -> Self {
    Self {
      provider,
      context: context.into(),
      strategy,
    }
  }

  async fn ambient_scope(
    &self,
    ctx: &InvocationContext,
    next: Next<'_>,
  ) -> Result<Outcome, Failure> {
    if let Some(scope) = ambient_scope() {
      tracing::debug!("{} joins the enclosing transaction", ctx.target());
      let result = next.run(ctx).await;
      if result.is_err() {
        scope.doom();
      }
      return result;
    }

    let unit_of_work = self.provider.begin(&self.context).await?;
    let mut boundary = TransactionBoundary::open(Arc::clone(&unit_of_work));
    let scope = Arc::new(AmbientScope::new(unit_of_work));

    match with_ambient_scope(Arc::clone(&scope), next.run(ctx)).await {
      Ok(_) if scope.is_doomed() => {
        tracing::warn!(
          "{} completed after an enclosed call failed, rolling back",
          ctx.target()
        );
        if let Err(e) = boundary.rollback().await {
          tracing::error!("Rollback for {} failed: {}", ctx.target(), e);
        }
        Err(Failure::Transaction(TransactionError::Aborted))
      }
      Ok(outcome) => {
        boundary.commit().await?;
        Ok(outcome)
      }
      Err(failure) => {
        if let Err(e) = boundary.rollback().await {
          tracing::error!("Rollback for {} failed: {}", ctx.target(), e);
        }
        Err(failure)
      }
    }
  }

  async fn context_bound(
    &self,
    ctx: &InvocationContext,
    next: Next<'_>,
  ) -> Result<Outcome, Failure> {
    let unit_of_work = self.provider.begin(&self.context).await?;
    let mut boundary = TransactionBoundary::open(Arc::clone(&unit_of_work));

    let result = match with_ambient_unit_of_work(Arc::clone(&unit_of_work), next.run(ctx)).await {
      Ok(outcome) => boundary
        .commit()
        .await
        .map(|()| outcome)
        .map_err(Failure::from),
      Err(failure) => Err(failure),
    };

    let cleanup = if boundary.state().is_terminal() {
      unit_of_work.rollback().await
    } else {
      boundary.rollback().await
    };

    if let Err(e) = cleanup {
      if boundary.state() == TransactionState::Committed {
        tracing::warn!(
          "Rollback after commit on '{}' for {} failed: {}",
          self.context,
          ctx.target(),
          e
        );
      } else {
        tracing::error!("Rollback for {} failed: {}", ctx.target(), e);
      }
    }

    result
  }
}

#[async_trait]
impl Interceptor for TransactionInterceptor {
  fn name(&self) -> &str {
    "transaction"
  }

  fn kind(&self) -> InterceptorKind {
    InterceptorKind::Transaction
  }

  async fn intercept(&self, ctx: &InvocationContext, next: Next<'_>) -> Result<Outcome, Failure> {
    match self.strategy {
      TransactionStrategy::AmbientScope => self.ambient_scope(ctx, next).await,
      TransactionStrategy::ContextBound => self.context_bound(ctx, next).await,
    }
  }
}
