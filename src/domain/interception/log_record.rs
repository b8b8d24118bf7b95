use serde::Serialize;
use serde_json::Value;
use std::fmt;

use super::invocation::InvocationContext;

/// User recorded when the request context has nobody to report
pub const UNKNOWN_USER: &str = "?";

/// Replacement for redacted parameter values
pub const REDACTED: &str = "***";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
  Info,
  Warning,
  Error,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Severity::Info => write!(f, "info"),
      Severity::Warning => write!(f, "warning"),
      Severity::Error => write!(f, "error"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogParameter {
  pub name: String,
  pub value: Value,
  #[serde(rename = "type")]
  pub type_name: String,
}

/// Structured description of an intercepted call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
  pub method: String,
  pub parameters: Vec<LogParameter>,
  pub user: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub exception_message: Option<String>,
}

impl LogRecord {
  /// Builds a record from the call's context
  ///
  /// Arguments and object fields whose name appears in `sensitive_fields`
  /// are replaced with `***` at any depth.
  pub fn from_context(
    ctx: &InvocationContext,
    user: Option<String>,
    sensitive_fields: &[String],
  ) -> Self {
    let parameters = ctx
      .arguments()
      .iter()
      .map(|argument| LogParameter {
        name: argument.name.clone(),
        value: if is_sensitive(&argument.name, sensitive_fields) {
          Value::String(REDACTED.to_string())
        } else {
          redact(argument.value.clone(), sensitive_fields)
        },
        type_name: argument.type_name.clone(),
      })
      .collect();

    Self {
      method: ctx.method_name().to_string(),
      parameters,
      user: user.unwrap_or_else(|| UNKNOWN_USER.to_string()),
      exception_message: None,
    }
  }

  pub fn with_exception_message(mut self, message: impl Into<String>) -> Self {
    self.exception_message = Some(message.into());
    self
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }
}

fn is_sensitive(name: &str, sensitive_fields: &[String]) -> bool {
  sensitive_fields
    .iter()
    .any(|field| field.eq_ignore_ascii_case(name))
}

fn redact(value: Value, sensitive_fields: &[String]) -> Value {
  match value {
    Value::Object(map) => Value::Object(
      map
        .into_iter()
        .map(|(key, value)| {
          if is_sensitive(&key, sensitive_fields) {
            (key, Value::String(REDACTED.to_string()))
          } else {
            (key, redact(value, sensitive_fields))
          }
        })
        .collect(),
    ),
    Value::Array(items) => Value::Array(
      items
        .into_iter()
        .map(|item| redact(item, sensitive_fields))
        .collect(),
    ),
    other => other,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::interception::invocation::{Argument, MethodTarget};
  use serde_json::json;

  fn context() -> InvocationContext {
    InvocationContext::new(
      MethodTarget::new("SignUpUseCase", "execute"),
      vec![Argument::capture(
        "command",
        &json!({ "username": "alice", "password": "hunter22", "nested": { "Password": "x" } }),
      )],
    )
  }

  #[test]
  fn test_unknown_user_placeholder() {
    let record = LogRecord::from_context(&context(), None, &[]);

    assert_eq!(record.user, "?");
    assert_eq!(record.method, "execute");
  }

  #[test]
  fn test_sensitive_fields_are_redacted() {
    let record = LogRecord::from_context(
      &context(),
      Some("alice".to_string()),
      &["password".to_string()],
    );

    let value = &record.parameters[0].value;
    assert_eq!(value["username"], "alice");
    assert_eq!(value["password"], "***");
    assert_eq!(value["nested"]["Password"], "***");
  }

  #[test]
  fn test_sensitive_argument_is_redacted_whole() {
    let ctx = InvocationContext::new(
      MethodTarget::new("ConfirmEmailUseCase", "confirm_email"),
      vec![
        Argument::capture("user_id", &"4f1c"),
        Argument::capture("verification_token", &"tok-secret"),
        Argument::capture("password", &json!({ "plain": "hunter22" })),
      ],
    );

    let record = LogRecord::from_context(
      &ctx,
      None,
      &["password".to_string(), "verification_token".to_string()],
    );

    assert_eq!(record.parameters[0].value, "4f1c");
    assert_eq!(record.parameters[1].value, "***");
    assert_eq!(record.parameters[2].value, "***");
    assert!(!record.to_json().unwrap().contains("tok-secret"));
  }

  #[test]
  fn test_serialized_shape() {
    let record = LogRecord::from_context(&context(), None, &[]).with_exception_message("boom");
    let json: Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

    assert_eq!(json["method"], "execute");
    assert_eq!(json["user"], "?");
    assert_eq!(json["exceptionMessage"], "boom");
    assert_eq!(json["parameters"][0]["name"], "command");
    assert_eq!(json["parameters"][0]["type"], "Value");
  }
}
