use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

use crate::domain::interception::{
  Argument, Failure, Interceptor, InterceptorKind, InvocationContext, RuleSetEvaluator,
  RuleViolation, ValidationFailure,
};

/// Checks the call's arguments against a named rule set before it runs
pub struct ValidationInterceptor {
  rule_set: String,
  evaluator: Arc<dyn RuleSetEvaluator>,
}

impl ValidationInterceptor {
  pub fn new(rule_set: impl Into<String>, evaluator: Arc<dyn RuleSetEvaluator>) -> Self {
    Self {
      rule_set: rule_set.into(),
      evaluator,
    }
  }
}

#[async_trait]
impl Interceptor for ValidationInterceptor {
  fn name(&self) -> &str {
    "validation"
  }

  fn kind(&self) -> InterceptorKind {
    InterceptorKind::Validation
  }

  async fn on_before(&self, ctx: &InvocationContext) -> Result<(), Failure> {
    self
      .evaluator
      .evaluate(&self.rule_set, ctx.arguments())
      .map_err(|failure| {
        tracing::debug!("{} rejected by '{}': {}", ctx.target(), self.rule_set, failure);
        Failure::Validation(failure)
      })
  }
}

type RuleSet = Box<dyn Fn(&[Argument]) -> Vec<RuleViolation> + Send + Sync>;

/// Rule sets backed by `validator`-derived types
///
/// A rule set reads one named argument, deserializes it into its rules type
/// and runs that type's `validate`.
#[derive(Default)]
pub struct RuleSetRegistry {
  rule_sets: HashMap<String, RuleSet>,
}

impl RuleSetRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register<T>(mut self, rule_set: impl Into<String>, argument: impl Into<String>) -> Self
  where
    T: DeserializeOwned + Validate + 'static,
  {
    let argument = argument.into();

    let check = move |arguments: &[Argument]| -> Vec<RuleViolation> {
      let Some(found) = arguments.iter().find(|a| a.name == argument) else {
        return vec![RuleViolation::new(argument.as_str(), "argument is missing")];
      };

      match serde_json::from_value::<T>(found.value.clone()) {
        Ok(value) => match value.validate() {
          Ok(()) => Vec::new(),
          Err(errors) => violations(&errors),
        },
        Err(e) => vec![RuleViolation::new(argument.as_str(), e.to_string())],
      }
    };

    self.rule_sets.insert(rule_set.into(), Box::new(check));
    self
  }
}

impl RuleSetEvaluator for RuleSetRegistry {
  fn evaluate(&self, rule_set: &str, arguments: &[Argument]) -> Result<(), ValidationFailure> {
    let check = self.rule_sets.get(rule_set).ok_or_else(|| {
      ValidationFailure::single(rule_set, "rule_set", "no such rule set is registered")
    })?;

    let violations = check(arguments);
    if violations.is_empty() {
      Ok(())
    } else {
      Err(ValidationFailure::new(rule_set, violations))
    }
  }
}

/// Flattens field errors, sorted by field name
fn violations(errors: &ValidationErrors) -> Vec<RuleViolation> {
  let mut violations: Vec<RuleViolation> = errors
    .field_errors()
    .into_iter()
    .flat_map(|(field, errors)| {
      errors.iter().map(move |error| {
        let message = error
          .message
          .as_ref()
          .map(|m| m.to_string())
          .unwrap_or_else(|| error.code.to_string());
        RuleViolation::new(field.to_string(), message)
      })
    })
    .collect();

  violations.sort_by(|a, b| a.field.cmp(&b.field));
  violations
}
