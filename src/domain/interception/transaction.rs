use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::failure::TransactionError;
use super::ports::UnitOfWork;

tokio::task_local! {
  static AMBIENT_SCOPE: Arc<AmbientScope>;
}

/// Unit of work shared by every transactional call of one logical flow
///
/// A joined call that fails dooms the scope: whoever opened it must roll
/// back even if the failure was swallowed on the way out.
pub struct AmbientScope {
  unit_of_work: Arc<dyn UnitOfWork>,
  doomed: AtomicBool,
}

impl AmbientScope {
  pub fn new(unit_of_work: Arc<dyn UnitOfWork>) -> Self {
    Self {
      unit_of_work,
      doomed: AtomicBool::new(false),
    }
  }

  pub fn unit_of_work(&self) -> &Arc<dyn UnitOfWork> {
    &self.unit_of_work
  }

  pub fn doom(&self) {
    self.doomed.store(true, Ordering::SeqCst);
  }

  pub fn is_doomed(&self) -> bool {
    self.doomed.load(Ordering::SeqCst)
  }
}

/// Scope bound to the current task, if any
pub fn ambient_scope() -> Option<Arc<AmbientScope>> {
  AMBIENT_SCOPE.try_with(Arc::clone).ok()
}

/// Unit of work bound to the current task, if any
///
/// Visible across every await of the flow that opened it and invisible to
/// sibling tasks.
pub fn ambient_unit_of_work() -> Option<Arc<dyn UnitOfWork>> {
  AMBIENT_SCOPE
    .try_with(|scope| Arc::clone(&scope.unit_of_work))
    .ok()
}

/// Runs `future` with `scope` bound as the ambient scope
pub async fn with_ambient_scope<F>(scope: Arc<AmbientScope>, future: F) -> F::Output
where
  F: Future,
{
  AMBIENT_SCOPE.scope(scope, future).await
}

/// Runs `future` inside a fresh scope over `unit_of_work`
pub async fn with_ambient_unit_of_work<F>(unit_of_work: Arc<dyn UnitOfWork>, future: F) -> F::Output
where
  F: Future,
{
  with_ambient_scope(Arc::new(AmbientScope::new(unit_of_work)), future).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
  Open,
  Committed,
  RolledBack,
}

impl TransactionState {
  pub fn is_terminal(self) -> bool {
    !matches!(self, TransactionState::Open)
  }
}

/// Tracks one unit of work from open to exactly one terminal state
///
/// A boundary dropped while still open (the call future was cancelled)
/// schedules a rollback on the current runtime.
pub struct TransactionBoundary {
  unit_of_work: Arc<dyn UnitOfWork>,
  state: TransactionState,
}

impl TransactionBoundary {
  pub fn open(unit_of_work: Arc<dyn UnitOfWork>) -> Self {
    Self {
      unit_of_work,
      state: TransactionState::Open,
    }
  }

  pub fn state(&self) -> TransactionState {
    self.state
  }

  pub fn unit_of_work(&self) -> &Arc<dyn UnitOfWork> {
    &self.unit_of_work
  }

  /// Commits the unit of work
  ///
  /// A failed commit leaves nothing durable, so the boundary resolves as
  /// rolled back and the error is returned.
  pub async fn commit(&mut self) -> Result<(), TransactionError> {
    self.ensure_open()?;

    match self.unit_of_work.commit().await {
      Ok(()) => {
        self.state = TransactionState::Committed;
        Ok(())
      }
      Err(e) => {
        self.state = TransactionState::RolledBack;
        Err(e)
      }
    }
  }

  /// Rolls the unit of work back
  pub async fn rollback(&mut self) -> Result<(), TransactionError> {
    self.ensure_open()?;

    self.state = TransactionState::RolledBack;
    self.unit_of_work.rollback().await
  }

  fn ensure_open(&self) -> Result<(), TransactionError> {
    if self.state.is_terminal() {
      return Err(TransactionError::AlreadyCompleted);
    }
    Ok(())
  }
}

impl Drop for TransactionBoundary {
  fn drop(&mut self) {
    if self.state.is_terminal() {
      return;
    }
    self.state = TransactionState::RolledBack;

    let unit_of_work = Arc::clone(&self.unit_of_work);
    match tokio::runtime::Handle::try_current() {
      Ok(handle) => {
        tracing::warn!("Transaction boundary dropped while open, rolling back");
        handle.spawn(async move {
          if let Err(e) = unit_of_work.rollback().await {
            tracing::error!("Rollback of abandoned transaction failed: {}", e);
          }
        });
      }
      Err(_) => {
        tracing::error!("Transaction boundary dropped outside a runtime, rollback left to the store");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::{InMemoryUnitOfWork, TxEvent};

  #[tokio::test]
  async fn test_commit_reaches_terminal_state_once() {
    let uow = Arc::new(InMemoryUnitOfWork::new());
    let mut boundary = TransactionBoundary::open(uow.clone());

    boundary.commit().await.unwrap();
    assert_eq!(boundary.state(), TransactionState::Committed);

    assert_eq!(
      boundary.rollback().await,
      Err(TransactionError::AlreadyCompleted)
    );
    assert_eq!(boundary.commit().await, Err(TransactionError::AlreadyCompleted));
    assert_eq!(boundary.state(), TransactionState::Committed);
    assert_eq!(uow.events(), vec![TxEvent::Commit]);
  }

  #[tokio::test]
  async fn test_failed_commit_resolves_as_rolled_back() {
    let uow = Arc::new(InMemoryUnitOfWork::new().failing_commit());
    let mut boundary = TransactionBoundary::open(uow.clone());

    assert!(boundary.commit().await.is_err());
    assert_eq!(boundary.state(), TransactionState::RolledBack);
  }

  #[tokio::test]
  async fn test_dropped_open_boundary_rolls_back() {
    let uow = Arc::new(InMemoryUnitOfWork::new());
    drop(TransactionBoundary::open(uow.clone()));

    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert_eq!(uow.events(), vec![TxEvent::Rollback]);
  }

  #[tokio::test]
  async fn test_ambient_scope_is_task_local() {
    let uow: Arc<dyn UnitOfWork> = Arc::new(InMemoryUnitOfWork::new());
    assert!(ambient_unit_of_work().is_none());

    with_ambient_unit_of_work(uow, async {
      assert!(ambient_unit_of_work().is_some());
      tokio::task::yield_now().await;
      assert!(ambient_unit_of_work().is_some());

      let sibling = tokio::spawn(async { ambient_unit_of_work().is_none() });
      assert!(sibling.await.unwrap());
    })
    .await;

    assert!(ambient_unit_of_work().is_none());
  }

  #[tokio::test]
  async fn test_doom_is_visible_to_the_whole_flow() {
    let scope = Arc::new(AmbientScope::new(Arc::new(InMemoryUnitOfWork::new())));

    with_ambient_scope(scope.clone(), async {
      assert!(!ambient_scope().unwrap().is_doomed());
      ambient_scope().unwrap().doom();
    })
    .await;

    assert!(scope.is_doomed());
  }
}
