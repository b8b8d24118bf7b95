use actix_web::{HttpResponse, web};
use std::sync::Arc;

use crate::adapters::http::errors::ApiError;
use crate::application::auth::{
  ConfirmEmailCommand, ConfirmEmailUseCase, GetUserByUsernameUseCase, SignInCommand,
  SignInUseCase, SignUpCommand, SignUpUseCase,
};

/// Use cases behind the account endpoints
pub struct AccountUseCases {
  pub sign_up_user: Arc<SignUpUseCase>,
  pub sign_up_admin: Arc<SignUpUseCase>,
  pub sign_in: Arc<SignInUseCase>,
  pub confirm_email: Arc<ConfirmEmailUseCase>,
  pub get_user: Arc<GetUserByUsernameUseCase>,
}

/// POST /api/account/sign-up
///
/// Body: SignUpCommand (JSON). Response: SignUpResponse with status 201.
pub async fn sign_up_handler(
  command: web::Json<SignUpCommand>,
  use_cases: web::Data<AccountUseCases>,
) -> Result<HttpResponse, ApiError> {
  let response = use_cases
    .sign_up_user
    .execute(command.into_inner())
    .await?;

  Ok(HttpResponse::Created().json(response))
}

/// POST /api/account/sign-up-admin
pub async fn sign_up_admin_handler(
  command: web::Json<SignUpCommand>,
  use_cases: web::Data<AccountUseCases>,
) -> Result<HttpResponse, ApiError> {
  let response = use_cases
    .sign_up_admin
    .execute(command.into_inner())
    .await?;

  Ok(HttpResponse::Created().json(response))
}

/// POST /api/account/sign-in
///
/// Response carries the bearer token for later requests.
pub async fn sign_in_handler(
  command: web::Json<SignInCommand>,
  use_cases: web::Data<AccountUseCases>,
) -> Result<HttpResponse, ApiError> {
  let response = use_cases.sign_in.execute(command.into_inner()).await?;

  Ok(HttpResponse::Ok().json(response))
}

/// GET /api/account/confirm-email?userId=&verificationToken=
pub async fn confirm_email_handler(
  query: web::Query<ConfirmEmailCommand>,
  use_cases: web::Data<AccountUseCases>,
) -> Result<HttpResponse, ApiError> {
  let response = use_cases.confirm_email.execute(query.into_inner()).await?;

  Ok(HttpResponse::Ok().json(response))
}

/// GET /api/users/{username}
pub async fn get_user_handler(
  path: web::Path<String>,
  use_cases: web::Data<AccountUseCases>,
) -> Result<HttpResponse, ApiError> {
  let response = use_cases.get_user.execute(path.into_inner()).await?;

  Ok(HttpResponse::Ok().json(response))
}
