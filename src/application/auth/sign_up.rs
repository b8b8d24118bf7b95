use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::auth::{AuthError, AuthService, Email, Password, Role, SignUpDetails, Username};
use crate::domain::interception::{Argument, Failure, InvocationContext, MethodTarget, Pipeline};

lazy_static! {
  pub(crate) static ref USERNAME_PATTERN: Regex =
    Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("username pattern compiles");
}

/// Command for creating a new account
#[derive(Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpCommand {
  #[validate(
    length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"),
    regex(
      path = *USERNAME_PATTERN,
      message = "Username may only contain letters, digits, '.', '_' and '-'"
    )
  )]
  pub username: String,

  #[validate(email(message = "Invalid email format"))]
  pub email: String,

  #[validate(length(
    min = 1,
    max = 100,
    message = "First name must be between 1 and 100 characters"
  ))]
  pub first_name: String,

  #[validate(length(
    min = 1,
    max = 100,
    message = "Last name must be between 1 and 100 characters"
  ))]
  pub last_name: String,

  #[validate(length(
    min = 8,
    max = 128,
    message = "Password must be between 8 and 128 characters"
  ))]
  pub password: String,
}

impl fmt::Debug for SignUpCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SignUpCommand")
      .field("username", &self.username)
      .field("email", &self.email)
      .field("first_name", &self.first_name)
      .field("last_name", &self.last_name)
      .field("password", &"[REDACTED]")
      .finish()
  }
}

/// Response after a successful sign-up
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
  pub user_id: Uuid,
  pub username: String,
  pub email: String,
  pub role: Role,
}

/// Creates an account with a fixed role and mails its verification link
///
/// Runs inside a transaction, so the user, its role assignment and the
/// verification token are written together or not at all.
pub struct SignUpUseCase {
  auth_service: Arc<AuthService>,
  pipeline: Pipeline,
  role: Role,
}

impl SignUpUseCase {
  pub fn new(auth_service: Arc<AuthService>, pipeline: Pipeline, role: Role) -> Self {
    Self {
      auth_service,
      pipeline,
      role,
    }
  }

  pub async fn execute(&self, command: SignUpCommand) -> Result<SignUpResponse, Failure> {
    let ctx = InvocationContext::new(
      MethodTarget::new("SignUpUseCase", "sign_up"),
      vec![
        Argument::capture("command", &command),
        Argument::capture("role", &self.role),
      ],
    );

    let role = self.role;
    self
      .pipeline
      .execute(ctx, async move {
        let details = SignUpDetails {
          username: Username::new(command.username).map_err(AuthError::from)?,
          email: Email::new(command.email).map_err(AuthError::from)?,
          first_name: command.first_name,
          last_name: command.last_name,
          password: Password::new(command.password).map_err(AuthError::from)?,
        };

        let outcome = self.auth_service.sign_up(details, role).await?;

        Ok::<_, Failure>(SignUpResponse {
          user_id: outcome.user.id,
          username: outcome.user.username,
          email: outcome.user.email,
          role,
        })
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::application::aspects::{LoggingInterceptor, LoggingMode};
  use crate::test_support::{AuthFixture, FixedRequestContext, RecordingLogger, only_record};

  fn command(username: &str) -> SignUpCommand {
    SignUpCommand {
      username: username.to_string(),
      email: format!("{}@example.com", username),
      first_name: "Ada".to_string(),
      last_name: "Lovelace".to_string(),
      password: "correct horse battery".to_string(),
    }
  }

  #[test]
  fn test_command_rules() {
    assert!(command("ada.l").validate().is_ok());

    let mut bad = command("a b");
    bad.password = "short".to_string();
    let errors = bad.validate().unwrap_err();
    let fields = errors.field_errors();
    assert!(fields.contains_key("username"));
    assert!(fields.contains_key("password"));
  }

  #[test]
  fn test_debug_hides_password() {
    let output = format!("{:?}", command("ada"));
    assert!(!output.contains("correct horse"));
    assert!(output.contains("[REDACTED]"));
  }

  #[tokio::test]
  async fn test_sign_up_assigns_role() {
    let fixture = AuthFixture::new();
    let use_case = SignUpUseCase::new(fixture.service.clone(), Pipeline::passthrough(), Role::Admin);

    let response = use_case.execute(command("ada")).await.unwrap();

    assert_eq!(response.username, "ada");
    assert_eq!(response.role, Role::Admin);
    assert_eq!(fixture.roles.roles_of(response.user_id), vec![Role::Admin]);
    assert_eq!(fixture.roles.known_roles(), vec![Role::Admin]);
    assert_eq!(fixture.mailer.sent().len(), 1);
  }

  #[tokio::test]
  async fn test_duplicate_is_logged_with_masked_password() {
    let fixture = AuthFixture::new();
    let logger = Arc::new(RecordingLogger::new());
    let pipeline = Pipeline::builder()
      .with(Arc::new(LoggingInterceptor::new(
        LoggingMode::Exception,
        logger.clone(),
        Arc::new(FixedRequestContext(None)),
        vec!["password".to_string()],
      )))
      .build()
      .unwrap();
    let use_case = SignUpUseCase::new(fixture.service.clone(), pipeline, Role::User);

    use_case.execute(command("ada")).await.unwrap();
    let error = use_case.execute(command("ada")).await.unwrap_err();

    assert!(matches!(
      error.downcast_ref::<AuthError>(),
      Some(AuthError::UsernameAlreadyExists)
    ));
    let record = only_record(&logger);
    assert_eq!(record.method(), "sign_up");
    assert!(!record.0.to_string().contains("correct horse"));
  }
}
