use async_trait::async_trait;
use futures_util::future::BoxFuture;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::interception::{
  TransactionError, UnitOfWork, UnitOfWorkProvider, ambient_unit_of_work,
};

/// Database transaction opened on one persistence context
pub struct PgUnitOfWork {
  context: String,
  transaction: Mutex<Option<Transaction<'static, Postgres>>>,
}

impl PgUnitOfWork {
  pub fn context(&self) -> &str {
    &self.context
  }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
  async fn commit(&self) -> Result<(), TransactionError> {
    let transaction = self
      .transaction
      .lock()
      .await
      .take()
      .ok_or(TransactionError::AlreadyCompleted)?;

    transaction
      .commit()
      .await
      .map_err(|e| TransactionError::CommitFailed(e.to_string()))
  }

  /// Fails once the transaction has been committed or rolled back
  async fn rollback(&self) -> Result<(), TransactionError> {
    let transaction = self.transaction.lock().await.take().ok_or_else(|| {
      TransactionError::RollbackFailed(format!(
        "transaction on '{}' is no longer active",
        self.context
      ))
    })?;

    transaction
      .rollback()
      .await
      .map_err(|e| TransactionError::RollbackFailed(e.to_string()))
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// Opens transactions on named connection pools
#[derive(Clone, Default)]
pub struct PgUnitOfWorkProvider {
  contexts: HashMap<String, PgPool>,
}

impl PgUnitOfWorkProvider {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_context(mut self, name: impl Into<String>, pool: PgPool) -> Self {
    self.contexts.insert(name.into(), pool);
    self
  }
}

#[async_trait]
impl UnitOfWorkProvider for PgUnitOfWorkProvider {
  async fn begin(&self, context: &str) -> Result<Arc<dyn UnitOfWork>, TransactionError> {
    let pool = self
      .contexts
      .get(context)
      .ok_or_else(|| TransactionError::UnknownContext(context.to_string()))?;

    let transaction = pool
      .begin()
      .await
      .map_err(|e| TransactionError::BeginFailed(e.to_string()))?;

    tracing::debug!(context = %context, "Database transaction started");

    Ok(Arc::new(PgUnitOfWork {
      context: context.to_string(),
      transaction: Mutex::new(Some(transaction)),
    }))
  }
}

/// Runs `work` on the ambient database transaction, or on a pooled
/// connection when the current flow has none
///
/// Queries issued through here join whatever transaction the interceptor
/// chain opened, so repositories never handle commit or rollback
/// themselves.
pub async fn with_connection<T, F>(pool: &PgPool, work: F) -> Result<T, sqlx::Error>
where
  F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, sqlx::Error>>,
{
  if let Some(unit_of_work) = ambient_unit_of_work() {
    if let Some(pg) = unit_of_work.as_any().downcast_ref::<PgUnitOfWork>() {
      let mut guard = pg.transaction.lock().await;
      return match guard.as_mut() {
        Some(transaction) => work(&mut **transaction).await,
        None => Err(sqlx::Error::Protocol(format!(
          "transaction on '{}' has already completed",
          pg.context
        ))),
      };
    }
  }

  let mut connection = pool.acquire().await?;
  work(&mut *connection).await
}
