use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use validator::Validate;

use crate::domain::auth::{AuthError, AuthService, Password, Role, Username};
use crate::domain::interception::{Argument, Failure, InvocationContext, MethodTarget, Pipeline};

/// Command for signing in with username and password
#[derive(Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignInCommand {
  #[validate(length(min = 1, message = "Username is required"))]
  pub username: String,

  #[validate(length(min = 1, message = "Password is required"))]
  pub password: String,
}

impl fmt::Debug for SignInCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SignInCommand")
      .field("username", &self.username)
      .field("password", &"[REDACTED]")
      .finish()
  }
}

/// Response after a successful sign-in
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
  pub username: String,
  pub email: String,
  pub roles: Vec<Role>,
  pub is_verified: bool,
  /// Bearer token for subsequent requests
  pub token: String,
  pub expires_at: DateTime<Utc>,
}

pub struct SignInUseCase {
  auth_service: Arc<AuthService>,
  pipeline: Pipeline,
}

impl SignInUseCase {
  pub fn new(auth_service: Arc<AuthService>, pipeline: Pipeline) -> Self {
    Self {
      auth_service,
      pipeline,
    }
  }

  /// # Errors
  /// Malformed usernames and passwords fail the same way wrong ones do,
  /// with `AuthError::InvalidCredentials`.
  pub async fn execute(&self, command: SignInCommand) -> Result<SignInResponse, Failure> {
    let ctx = InvocationContext::new(
      MethodTarget::new("SignInUseCase", "sign_in"),
      vec![Argument::capture("command", &command)],
    );

    self
      .pipeline
      .execute(ctx, async move {
        let username =
          Username::new(command.username).map_err(|_| AuthError::InvalidCredentials)?;
        let password =
          Password::new(command.password).map_err(|_| AuthError::InvalidCredentials)?;

        let outcome = self.auth_service.sign_in(username, password).await?;

        tracing::info!(user_id = %outcome.user.id, "User signed in");

        Ok::<_, Failure>(SignInResponse {
          username: outcome.user.username,
          email: outcome.user.email,
          roles: outcome.roles,
          is_verified: outcome.user.is_email_verified,
          token: outcome.token.into_inner(),
          expires_at: outcome.session.expires_at,
        })
      })
      .await
  }
}
