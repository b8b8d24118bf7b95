use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::{AuthError, AuthService, Role, Username};
use crate::domain::interception::{Argument, Failure, InvocationContext, MethodTarget, Pipeline};

/// Public view of an account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub is_verified: bool,
  pub roles: Vec<Role>,
  pub created_at: DateTime<Utc>,
}

pub struct GetUserByUsernameUseCase {
  auth_service: Arc<AuthService>,
  pipeline: Pipeline,
}

impl GetUserByUsernameUseCase {
  pub fn new(auth_service: Arc<AuthService>, pipeline: Pipeline) -> Self {
    Self {
      auth_service,
      pipeline,
    }
  }

  pub async fn execute(&self, username: String) -> Result<UserResponse, Failure> {
    let ctx = InvocationContext::new(
      MethodTarget::new("GetUserByUsernameUseCase", "get_user_by_username"),
      vec![Argument::capture("username", &username)],
    );

    self
      .pipeline
      .execute(ctx, async move {
        let username = Username::new(username).map_err(|_| AuthError::UserNotFound)?;
        let profile = self.auth_service.find_by_username(&username).await?;

        Ok::<_, Failure>(UserResponse {
          id: profile.user.id,
          username: profile.user.username,
          email: profile.user.email,
          first_name: profile.user.first_name,
          last_name: profile.user.last_name,
          is_verified: profile.user.is_email_verified,
          roles: profile.roles,
          created_at: profile.user.created_at,
        })
      })
      .await
  }
}
