use actix_web::{
  HttpResponse,
  error::ResponseError,
  http::{StatusCode, header::ContentType},
};
use std::fmt;

use crate::domain::auth::{AuthError, RepositoryError};
use crate::domain::interception::{Failure, RuleViolation};

use super::dtos::ErrorResponse;

/// API error type that maps pipeline failures to HTTP responses
#[derive(Debug)]
pub enum ApiError {
  /// Rejected input (400 Bad Request)
  Validation {
    message: String,
    violations: Vec<RuleViolation>,
  },

  /// Authentication or account error
  Auth(AuthErrorKind),

  /// Internal server error (500 Internal Server Error)
  Internal(String),
}

/// Authentication error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
  /// Invalid credentials (401)
  InvalidCredentials,

  /// Session expired or invalid (401)
  InvalidSession,

  /// Missing or malformed bearer token (401)
  InvalidToken,

  /// Username already taken (409)
  UsernameAlreadyExists,

  /// Email already registered (409)
  EmailAlreadyExists,

  /// User not found (404)
  UserNotFound,

  /// Verification link is wrong or expired (400)
  InvalidVerificationToken,

  /// Email was verified before (409)
  EmailAlreadyVerified,
}

impl AuthErrorKind {
  fn status_code(self) -> StatusCode {
    match self {
      AuthErrorKind::InvalidCredentials
      | AuthErrorKind::InvalidSession
      | AuthErrorKind::InvalidToken => StatusCode::UNAUTHORIZED,
      AuthErrorKind::UsernameAlreadyExists
      | AuthErrorKind::EmailAlreadyExists
      | AuthErrorKind::EmailAlreadyVerified => StatusCode::CONFLICT,
      AuthErrorKind::UserNotFound => StatusCode::NOT_FOUND,
      AuthErrorKind::InvalidVerificationToken => StatusCode::BAD_REQUEST,
    }
  }

  fn code_and_message(self) -> (&'static str, &'static str) {
    match self {
      AuthErrorKind::InvalidCredentials => {
        ("invalid_credentials", "Invalid username or password")
      }
      AuthErrorKind::InvalidSession => ("invalid_session", "Invalid or expired session"),
      AuthErrorKind::InvalidToken => (
        "invalid_token",
        "Invalid or missing authorization token",
      ),
      AuthErrorKind::UsernameAlreadyExists => (
        "username_already_exists",
        "An account with this username already exists",
      ),
      AuthErrorKind::EmailAlreadyExists => (
        "email_already_exists",
        "An account with this email already exists",
      ),
      AuthErrorKind::UserNotFound => ("user_not_found", "User not found"),
      AuthErrorKind::InvalidVerificationToken => (
        "invalid_verification_token",
        "Invalid or expired verification link",
      ),
      AuthErrorKind::EmailAlreadyVerified => {
        ("email_already_verified", "Email is already verified")
      }
    }
  }
}

impl fmt::Display for ApiError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ApiError::Validation { message, .. } => write!(f, "Validation error: {}", message),
      ApiError::Auth(kind) => write!(f, "Authentication error: {:?}", kind),
      ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
    }
  }
}

impl ResponseError for ApiError {
  fn status_code(&self) -> StatusCode {
    match self {
      ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
      ApiError::Auth(kind) => kind.status_code(),
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let response = match self {
      ApiError::Validation {
        message,
        violations,
      } => ErrorResponse {
        error: "validation_error".to_string(),
        message: message.clone(),
        details: serde_json::to_value(violations).ok(),
      },
      ApiError::Auth(kind) => {
        let (code, message) = kind.code_and_message();
        ErrorResponse {
          error: code.to_string(),
          message: message.to_string(),
          details: None,
        }
      }
      ApiError::Internal(msg) => {
        tracing::error!("Internal error: {}", msg);
        ErrorResponse {
          error: "internal_error".to_string(),
          message: "An internal server error occurred".to_string(),
          details: None,
        }
      }
    };

    HttpResponse::build(self.status_code())
      .content_type(ContentType::json())
      .json(response)
  }
}

impl From<&AuthError> for ApiError {
  fn from(error: &AuthError) -> Self {
    let kind = match error {
      AuthError::InvalidCredentials => AuthErrorKind::InvalidCredentials,
      AuthError::UsernameAlreadyExists => AuthErrorKind::UsernameAlreadyExists,
      AuthError::EmailAlreadyExists => AuthErrorKind::EmailAlreadyExists,
      AuthError::UserNotFound | AuthError::Repository(RepositoryError::NotFound) => {
        AuthErrorKind::UserNotFound
      }
      AuthError::InvalidSession => AuthErrorKind::InvalidSession,
      AuthError::InvalidVerificationToken => AuthErrorKind::InvalidVerificationToken,
      AuthError::EmailAlreadyVerified => AuthErrorKind::EmailAlreadyVerified,
      AuthError::ValueObject(err) => {
        return ApiError::Validation {
          message: err.to_string(),
          violations: Vec::new(),
        };
      }
      AuthError::Repository(_) | AuthError::Hash(_) | AuthError::Mail(_) => {
        return ApiError::Internal(error.to_string());
      }
    };

    ApiError::Auth(kind)
  }
}

impl From<AuthError> for ApiError {
  fn from(error: AuthError) -> Self {
    ApiError::from(&error)
  }
}

impl From<Failure> for ApiError {
  fn from(failure: Failure) -> Self {
    if let Failure::Validation(rejected) = &failure {
      return ApiError::Validation {
        message: format!("Request rejected by '{}'", rejected.rule_set),
        violations: rejected.violations.clone(),
      };
    }

    match failure.downcast_ref::<AuthError>() {
      Some(error) => ApiError::from(error),
      None => ApiError::Internal(failure.log_message()),
    }
  }
}
