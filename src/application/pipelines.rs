//! Per-operation aspect tables and the factory that turns them into pipelines

use std::sync::Arc;
use std::time::Duration;

use super::aspects::{
  LoggingInterceptor, LoggingMode, PerformanceInterceptor, TransactionInterceptor,
  TransactionStrategy, ValidationInterceptor,
};
use crate::domain::interception::{
  DiagnosticSink, Interceptor, Pipeline, PipelineError, RequestContext, RuleSetEvaluator,
  StructuredLogger, UnitOfWorkProvider,
};

/// One cross-cutting behavior attached to an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectSpec {
  Transaction,
  Validation(&'static str),
  ExceptionLog,
  AuditLog,
  Performance,
}

pub const SIGN_UP_ASPECTS: &[AspectSpec] = &[
  AspectSpec::Transaction,
  AspectSpec::Validation("sign_up"),
  AspectSpec::ExceptionLog,
  AspectSpec::Performance,
];

pub const SIGN_IN_ASPECTS: &[AspectSpec] = &[
  AspectSpec::Validation("sign_in"),
  AspectSpec::ExceptionLog,
  AspectSpec::Performance,
];

pub const CONFIRM_EMAIL_ASPECTS: &[AspectSpec] =
  &[AspectSpec::Transaction, AspectSpec::ExceptionLog];

pub const GET_USER_ASPECTS: &[AspectSpec] = &[
  AspectSpec::AuditLog,
  AspectSpec::ExceptionLog,
  AspectSpec::Performance,
];

/// Ports the interceptors report to
pub struct AspectPorts {
  pub unit_of_work: Arc<dyn UnitOfWorkProvider>,
  pub rule_sets: Arc<dyn RuleSetEvaluator>,
  pub logger: Arc<dyn StructuredLogger>,
  pub request_context: Arc<dyn RequestContext>,
  pub diagnostics: Arc<dyn DiagnosticSink>,
}

#[derive(Debug, Clone)]
pub struct AspectSettings {
  /// Persistence context transactions are opened on
  pub persistence_context: String,
  pub transaction_strategy: TransactionStrategy,
  pub performance_threshold: Duration,
  /// When false, `AuditLog` aspects are left out of built pipelines
  pub audit_entry_logging: bool,
  pub sensitive_fields: Vec<String>,
}

impl Default for AspectSettings {
  fn default() -> Self {
    Self {
      persistence_context: "default".to_string(),
      transaction_strategy: TransactionStrategy::AmbientScope,
      performance_threshold: Duration::from_secs(5),
      audit_entry_logging: false,
      sensitive_fields: vec!["password".to_string(), "verification_token".to_string()],
    }
  }
}

/// Builds pipelines from aspect tables
pub struct AspectFactory {
  ports: AspectPorts,
  settings: AspectSettings,
}

impl AspectFactory {
  pub fn new(ports: AspectPorts, settings: AspectSettings) -> Self {
    Self { ports, settings }
  }

  /// Builds the pipeline for one operation, outermost aspect first
  pub fn pipeline(&self, aspects: &[AspectSpec]) -> Result<Pipeline, PipelineError> {
    let interceptors = aspects
      .iter()
      .filter_map(|aspect| self.interceptor(*aspect));

    Pipeline::builder().with_all(interceptors).build()
  }

  fn interceptor(&self, aspect: AspectSpec) -> Option<Arc<dyn Interceptor>> {
    let interceptor: Arc<dyn Interceptor> = match aspect {
      AspectSpec::Transaction => Arc::new(TransactionInterceptor::new(
        self.ports.unit_of_work.clone(),
        self.settings.persistence_context.clone(),
        self.settings.transaction_strategy,
      )),
      AspectSpec::Validation(rule_set) => Arc::new(ValidationInterceptor::new(
        rule_set,
        self.ports.rule_sets.clone(),
      )),
      AspectSpec::ExceptionLog => Arc::new(self.logging(LoggingMode::Exception)),
      AspectSpec::AuditLog if self.settings.audit_entry_logging => {
        Arc::new(self.logging(LoggingMode::Entry))
      }
      AspectSpec::AuditLog => return None,
      AspectSpec::Performance => Arc::new(PerformanceInterceptor::new(
        self.settings.performance_threshold,
        self.ports.diagnostics.clone(),
      )),
    };

    Some(interceptor)
  }

  fn logging(&self, mode: LoggingMode) -> LoggingInterceptor {
    LoggingInterceptor::new(
      mode,
      self.ports.logger.clone(),
      self.ports.request_context.clone(),
      self.settings.sensitive_fields.clone(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::interception::{Failure, InvocationContext, MethodTarget};
  use crate::test_support::{
    FixedRequestContext, InMemoryUnitOfWorkProvider, RecordingDiagnosticSink, RecordingLogger,
    ScriptedRuleSets, TxEvent, only_record,
  };

  struct Harness {
    factory: AspectFactory,
    unit_of_work: Arc<InMemoryUnitOfWorkProvider>,
    logger: Arc<RecordingLogger>,
  }

  fn harness(rule_sets: ScriptedRuleSets, settings: AspectSettings) -> Harness {
    let unit_of_work = Arc::new(InMemoryUnitOfWorkProvider::new());
    let logger = Arc::new(RecordingLogger::new());

    let factory = AspectFactory::new(
      AspectPorts {
        unit_of_work: unit_of_work.clone(),
        rule_sets: Arc::new(rule_sets),
        logger: logger.clone(),
        request_context: Arc::new(FixedRequestContext(None)),
        diagnostics: Arc::new(RecordingDiagnosticSink::new()),
      },
      settings,
    );

    Harness {
      factory,
      unit_of_work,
      logger,
    }
  }

  fn ctx() -> InvocationContext {
    InvocationContext::new(MethodTarget::new("SignUpUseCase", "sign_up"), vec![])
  }

  #[test]
  fn test_tables_build_in_declared_order() {
    let h = harness(ScriptedRuleSets::default(), AspectSettings::default());

    assert_eq!(
      h.factory.pipeline(SIGN_UP_ASPECTS).unwrap().names(),
      vec!["transaction", "validation", "exception_log", "performance"]
    );
    assert_eq!(
      h.factory.pipeline(CONFIRM_EMAIL_ASPECTS).unwrap().names(),
      vec!["transaction", "exception_log"]
    );
  }

  #[test]
  fn test_audit_log_follows_setting() {
    let off = harness(ScriptedRuleSets::default(), AspectSettings::default());
    assert_eq!(
      off.factory.pipeline(GET_USER_ASPECTS).unwrap().names(),
      vec!["exception_log", "performance"]
    );

    let on = harness(
      ScriptedRuleSets::default(),
      AspectSettings {
        audit_entry_logging: true,
        ..AspectSettings::default()
      },
    );
    assert_eq!(
      on.factory.pipeline(GET_USER_ASPECTS).unwrap().names(),
      vec!["audit_log", "exception_log", "performance"]
    );
  }

  #[test]
  fn test_transaction_inside_other_aspects_is_rejected() {
    let h = harness(ScriptedRuleSets::default(), AspectSettings::default());

    let result = h
      .factory
      .pipeline(&[AspectSpec::ExceptionLog, AspectSpec::Transaction]);

    assert!(matches!(
      result,
      Err(PipelineError::TransactionNotOutermost { .. })
    ));
  }

  #[tokio::test]
  async fn test_failing_sign_up_rolls_back_logs_once_and_reraises() {
    let h = harness(ScriptedRuleSets::default(), AspectSettings::default());
    let pipeline = h.factory.pipeline(SIGN_UP_ASPECTS).unwrap();

    let error = pipeline
      .execute(ctx(), async { Err::<(), _>(Failure::message("duplicate")) })
      .await
      .unwrap_err();

    assert_eq!(error.to_string(), "duplicate");
    assert_eq!(h.unit_of_work.events(), vec![TxEvent::Rollback]);
    assert_eq!(only_record(&h.logger).exception_message(), Some("duplicate"));
  }

  #[tokio::test]
  async fn test_rejected_sign_up_never_commits() {
    let h = harness(
      ScriptedRuleSets::rejecting("sign_up"),
      AspectSettings::default(),
    );
    let pipeline = h.factory.pipeline(SIGN_UP_ASPECTS).unwrap();

    let error = pipeline
      .execute(ctx(), async { Ok::<_, Failure>(()) })
      .await
      .unwrap_err();

    assert!(error.is_validation());
    assert_eq!(h.unit_of_work.events(), vec![TxEvent::Rollback]);
    assert!(!h.unit_of_work.events().contains(&TxEvent::Commit));
  }

  #[tokio::test]
  async fn test_successful_sign_up_commits_once() {
    let h = harness(ScriptedRuleSets::default(), AspectSettings::default());
    let pipeline = h.factory.pipeline(SIGN_UP_ASPECTS).unwrap();

    pipeline
      .execute(ctx(), async { Ok::<_, Failure>(()) })
      .await
      .unwrap();

    assert_eq!(h.unit_of_work.events(), vec![TxEvent::Commit]);
    assert!(h.logger.entries().is_empty());
  }
}
