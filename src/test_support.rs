//! In-memory fakes for the ports, shared by unit tests

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::domain::auth::{
  AuthError, AuthService, AuthSettings, Email, MailMessage, Mailer, RepositoryError, Role,
  RoleRepository, Session, SessionRepository, User, UserRepository, Username,
};
use crate::domain::interception::{
  Argument, DiagnosticSink, PerformanceSample, RequestContext, RuleSetEvaluator,
  Severity, StructuredLogger, TransactionError, UnitOfWork, UnitOfWorkProvider,
  ValidationFailure,
};
use crate::infrastructure::security::{Argon2Cost, Argon2PasswordHasher, SecureTokenGenerator};

// ============================================================================
// Units of work
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEvent {
  Commit,
  Rollback,
}

pub struct InMemoryUnitOfWork {
  events: Arc<Mutex<Vec<TxEvent>>>,
  fail_commit: bool,
  fail_rollback: bool,
}

impl InMemoryUnitOfWork {
  pub fn new() -> Self {
    Self {
      events: Arc::new(Mutex::new(Vec::new())),
      fail_commit: false,
      fail_rollback: false,
    }
  }

  pub fn failing_commit(mut self) -> Self {
    self.fail_commit = true;
    self
  }

  pub fn events(&self) -> Vec<TxEvent> {
    self.events.lock().unwrap().clone()
  }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
  async fn commit(&self) -> Result<(), TransactionError> {
    if self.fail_commit {
      return Err(TransactionError::CommitFailed("commit refused".to_string()));
    }
    self.events.lock().unwrap().push(TxEvent::Commit);
    Ok(())
  }

  async fn rollback(&self) -> Result<(), TransactionError> {
    self.events.lock().unwrap().push(TxEvent::Rollback);
    if self.fail_rollback {
      return Err(TransactionError::RollbackFailed(
        "transaction already closed".to_string(),
      ));
    }
    Ok(())
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// Provider whose units of work share one event journal
#[derive(Default)]
pub struct InMemoryUnitOfWorkProvider {
  events: Arc<Mutex<Vec<TxEvent>>>,
  begun: Mutex<Vec<String>>,
  known_contexts: Option<Vec<String>>,
  fail_rollback: bool,
}

impl InMemoryUnitOfWorkProvider {
  pub fn new() -> Self {
    Self::default()
  }

  /// Only the listed contexts can be opened
  pub fn with_contexts(contexts: &[&str]) -> Self {
    Self {
      known_contexts: Some(contexts.iter().map(|c| c.to_string()).collect()),
      ..Self::default()
    }
  }

  pub fn failing_rollback(mut self) -> Self {
    self.fail_rollback = true;
    self
  }

  pub fn events(&self) -> Vec<TxEvent> {
    self.events.lock().unwrap().clone()
  }

  /// Context names in the order they were opened
  pub fn begun(&self) -> Vec<String> {
    self.begun.lock().unwrap().clone()
  }
}

#[async_trait]
impl UnitOfWorkProvider for InMemoryUnitOfWorkProvider {
  async fn begin(&self, context: &str) -> Result<Arc<dyn UnitOfWork>, TransactionError> {
    if let Some(known) = &self.known_contexts {
      if !known.iter().any(|c| c == context) {
        return Err(TransactionError::UnknownContext(context.to_string()));
      }
    }

    self.begun.lock().unwrap().push(context.to_string());
    Ok(Arc::new(InMemoryUnitOfWork {
      events: Arc::clone(&self.events),
      fail_commit: false,
      fail_rollback: self.fail_rollback,
    }))
  }
}

// ============================================================================
// Interception sinks
// ============================================================================

#[derive(Default)]
pub struct RecordingLogger {
  entries: Mutex<Vec<(Severity, String)>>,
}

impl RecordingLogger {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn entries(&self) -> Vec<(Severity, String)> {
    self.entries.lock().unwrap().clone()
  }

  /// Logged payloads parsed back into JSON
  pub fn records(&self) -> Vec<serde_json::Value> {
    self
      .entries()
      .into_iter()
      .map(|(_, payload)| serde_json::from_str(&payload).unwrap())
      .collect()
  }
}

impl StructuredLogger for RecordingLogger {
  fn log(&self, severity: Severity, payload: String) {
    self.entries.lock().unwrap().push((severity, payload));
  }
}

#[derive(Default)]
pub struct RecordingDiagnosticSink {
  samples: Mutex<Vec<PerformanceSample>>,
}

impl RecordingDiagnosticSink {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn samples(&self) -> Vec<PerformanceSample> {
    self.samples.lock().unwrap().clone()
  }
}

impl DiagnosticSink for RecordingDiagnosticSink {
  fn report(&self, sample: &PerformanceSample) {
    self.samples.lock().unwrap().push(sample.clone());
  }
}

pub struct FixedRequestContext(pub Option<String>);

impl RequestContext for FixedRequestContext {
  fn acting_user(&self) -> Option<String> {
    self.0.clone()
  }
}

/// Evaluator that accepts everything except the listed rule sets
#[derive(Default)]
pub struct ScriptedRuleSets {
  rejected: Vec<String>,
}

impl ScriptedRuleSets {
  pub fn rejecting(rule_set: &str) -> Self {
    Self {
      rejected: vec![rule_set.to_string()],
    }
  }
}

impl RuleSetEvaluator for ScriptedRuleSets {
  fn evaluate(&self, rule_set: &str, _arguments: &[Argument]) -> Result<(), ValidationFailure> {
    if self.rejected.iter().any(|r| r == rule_set) {
      return Err(ValidationFailure::single(rule_set, "input", "rejected"));
    }
    Ok(())
  }
}

/// Parses the single record a logger holds
pub fn only_record(logger: &RecordingLogger) -> LogRecordJson {
  let records = logger.records();
  assert_eq!(records.len(), 1, "expected exactly one log record");
  LogRecordJson(records.into_iter().next().unwrap())
}

/// JSON view of a serialized `LogRecord`
pub struct LogRecordJson(pub serde_json::Value);

impl LogRecordJson {
  pub fn exception_message(&self) -> Option<&str> {
    self.0["exceptionMessage"].as_str()
  }

  pub fn user(&self) -> &str {
    self.0["user"].as_str().unwrap_or_default()
  }

  pub fn method(&self) -> &str {
    self.0["method"].as_str().unwrap_or_default()
  }
}

// ============================================================================
// Auth repositories
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
  users: Mutex<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
  async fn create(&self, user: User) -> Result<User, AuthError> {
    let mut users = self.users.lock().unwrap();
    if users
      .values()
      .any(|u| u.username == user.username || u.email == user.email)
    {
      return Err(RepositoryError::DuplicateKey("users".to_string()).into());
    }
    users.insert(user.id, user.clone());
    Ok(user)
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
    Ok(self.users.lock().unwrap().get(&id).cloned())
  }

  async fn find_by_username(&self, username: &Username) -> Result<Option<User>, AuthError> {
    Ok(
      self
        .users
        .lock()
        .unwrap()
        .values()
        .find(|u| u.username == username.as_str())
        .cloned(),
    )
  }

  async fn find_by_email(&self, email: &Email) -> Result<Option<User>, AuthError> {
    Ok(
      self
        .users
        .lock()
        .unwrap()
        .values()
        .find(|u| u.email == email.as_str())
        .cloned(),
    )
  }

  async fn update(&self, user: User) -> Result<User, AuthError> {
    let mut users = self.users.lock().unwrap();
    if !users.contains_key(&user.id) {
      return Err(RepositoryError::NotFound.into());
    }
    users.insert(user.id, user.clone());
    Ok(user)
  }
}

#[derive(Default)]
pub struct InMemoryRoleRepository {
  roles: Mutex<Vec<Role>>,
  grants: Mutex<Vec<(Uuid, Role)>>,
}

impl InMemoryRoleRepository {
  pub fn roles_of(&self, user_id: Uuid) -> Vec<Role> {
    self
      .grants
      .lock()
      .unwrap()
      .iter()
      .filter(|(id, _)| *id == user_id)
      .map(|(_, role)| *role)
      .collect()
  }

  pub fn known_roles(&self) -> Vec<Role> {
    self.roles.lock().unwrap().clone()
  }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
  async fn ensure_exists(&self, role: Role) -> Result<(), AuthError> {
    let mut roles = self.roles.lock().unwrap();
    if !roles.contains(&role) {
      roles.push(role);
    }
    Ok(())
  }

  async fn assign(&self, user_id: Uuid, role: Role) -> Result<(), AuthError> {
    self.grants.lock().unwrap().push((user_id, role));
    Ok(())
  }

  async fn roles_for(&self, user_id: Uuid) -> Result<Vec<Role>, AuthError> {
    Ok(self.roles_of(user_id))
  }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
  sessions: Mutex<HashMap<Uuid, Session>>,
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
  async fn create(&self, session: Session) -> Result<Session, AuthError> {
    self
      .sessions
      .lock()
      .unwrap()
      .insert(session.id, session.clone());
    Ok(session)
  }

  async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, AuthError> {
    Ok(
      self
        .sessions
        .lock()
        .unwrap()
        .values()
        .find(|s| s.token_hash == token_hash)
        .cloned(),
    )
  }

  async fn delete(&self, session_id: Uuid) -> Result<(), AuthError> {
    self.sessions.lock().unwrap().remove(&session_id);
    Ok(())
  }
}

#[derive(Default)]
pub struct RecordingMailer {
  sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
  pub fn sent(&self) -> Vec<MailMessage> {
    self.sent.lock().unwrap().clone()
  }
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, message: MailMessage) -> Result<(), AuthError> {
    self.sent.lock().unwrap().push(message);
    Ok(())
  }
}

/// Auth service wired to in-memory adapters
pub struct AuthFixture {
  pub service: Arc<AuthService>,
  pub users: Arc<InMemoryUserRepository>,
  pub roles: Arc<InMemoryRoleRepository>,
  pub sessions: Arc<InMemorySessionRepository>,
  pub mailer: Arc<RecordingMailer>,
}

impl AuthFixture {
  pub fn new() -> Self {
    let users = Arc::new(InMemoryUserRepository::default());
    let roles = Arc::new(InMemoryRoleRepository::default());
    let sessions = Arc::new(InMemorySessionRepository::default());
    let mailer = Arc::new(RecordingMailer::default());
    let hasher = Argon2PasswordHasher::with_cost(Argon2Cost {
      memory_kib: 1024,
      iterations: 1,
      parallelism: 1,
    })
    .unwrap();

    let service = Arc::new(AuthService::new(
      users.clone(),
      roles.clone(),
      sessions.clone(),
      Arc::new(hasher),
      Arc::new(SecureTokenGenerator::new()),
      mailer.clone(),
      AuthSettings::default(),
    ));

    Self {
      service,
      users,
      roles,
      sessions,
      mailer,
    }
  }
}
