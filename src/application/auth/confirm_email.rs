use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::auth::AuthService;
use crate::domain::interception::{Argument, Failure, InvocationContext, MethodTarget, Pipeline};

/// Parameters carried by the verification link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEmailCommand {
  pub user_id: Uuid,
  pub verification_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEmailResponse {
  pub user_id: Uuid,
  pub is_verified: bool,
}

/// Marks an account's email as verified
pub struct ConfirmEmailUseCase {
  auth_service: Arc<AuthService>,
  pipeline: Pipeline,
}

impl ConfirmEmailUseCase {
  pub fn new(auth_service: Arc<AuthService>, pipeline: Pipeline) -> Self {
    Self {
      auth_service,
      pipeline,
    }
  }

  pub async fn execute(&self, command: ConfirmEmailCommand) -> Result<ConfirmEmailResponse, Failure> {
    let ctx = InvocationContext::new(
      MethodTarget::new("ConfirmEmailUseCase", "confirm_email"),
      vec![
        Argument::capture("user_id", &command.user_id),
        Argument::capture("verification_token", &command.verification_token),
      ],
    );

    self
      .pipeline
      .execute(ctx, async move {
        let user = self
          .auth_service
          .confirm_email(command.user_id, &command.verification_token)
          .await?;

        Ok::<_, Failure>(ConfirmEmailResponse {
          user_id: user.id,
          is_verified: user.is_email_verified,
        })
      })
      .await
  }
}
