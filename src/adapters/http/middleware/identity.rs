use actix_web::{
  Error, HttpMessage, ResponseError,
  body::EitherBody,
  dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::{
  future::{Ready, ready},
  rc::Rc,
  sync::Arc,
};
use uuid::Uuid;

use crate::adapters::http::errors::{ApiError, AuthErrorKind};
use crate::domain::auth::{AuthService, SessionToken};
use crate::domain::interception::RequestContext;

tokio::task_local! {
  static ACTING_USER: Identity;
}

/// User resolved from the request's bearer session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
  pub user_id: Uuid,
  pub username: String,
}

/// Resolves `Authorization: Bearer <token>` into an `Identity`
///
/// The identity is stored in request extensions and bound to the request's
/// task for the rest of the chain, where `TaskLocalRequestContext` reads it.
/// With `required()` a missing or invalid session is answered with 401;
/// with `optional()` the request continues anonymously.
pub struct IdentityMiddleware {
  auth_service: Arc<AuthService>,
  required: bool,
}

impl IdentityMiddleware {
  pub fn required(auth_service: Arc<AuthService>) -> Self {
    Self {
      auth_service,
      required: true,
    }
  }

  pub fn optional(auth_service: Arc<AuthService>) -> Self {
    Self {
      auth_service,
      required: false,
    }
  }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<EitherBody<B>>;
  type Error = Error;
  type Transform = IdentityMiddlewareService<S>;
  type InitError = ();
  type Future = Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    ready(Ok(IdentityMiddlewareService {
      service: Rc::new(service),
      auth_service: self.auth_service.clone(),
      required: self.required,
    }))
  }
}

pub struct IdentityMiddlewareService<S> {
  service: Rc<S>,
  auth_service: Arc<AuthService>,
  required: bool,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<EitherBody<B>>;
  type Error = Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  forward_ready!(service);

  fn call(&self, req: ServiceRequest) -> Self::Future {
    let service = Rc::clone(&self.service);
    let auth_service = self.auth_service.clone();
    let required = self.required;

    Box::pin(async move {
      let resolved = match extract_session_token(&req) {
        Ok(token) => auth_service
          .validate_session(&token)
          .await
          .map(|user| Identity {
            user_id: user.id,
            username: user.username,
          })
          .map_err(ApiError::from),
        Err(e) => Err(e),
      };

      match resolved {
        Ok(identity) => {
          req.extensions_mut().insert(identity.clone());
          let res = ACTING_USER.scope(identity, service.call(req)).await?;
          Ok(res.map_into_left_body())
        }
        Err(e) if required => {
          tracing::debug!("Rejected unauthenticated request: {}", e);
          let (request, _) = req.into_parts();
          let response = e.error_response().map_into_right_body();
          Ok(ServiceResponse::new(request, response))
        }
        Err(_) => {
          let res = service.call(req).await?;
          Ok(res.map_into_left_body())
        }
      }
    })
  }
}

/// Extract session token from Authorization header
fn extract_session_token(req: &ServiceRequest) -> Result<SessionToken, ApiError> {
  req
    .headers()
    .get("Authorization")
    .and_then(|h| h.to_str().ok())
    .and_then(|s| s.strip_prefix("Bearer "))
    .and_then(|s| SessionToken::from_string(s.trim().to_string()).ok())
    .ok_or(ApiError::Auth(AuthErrorKind::InvalidToken))
}

/// Reads the acting user bound by `IdentityMiddleware`
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskLocalRequestContext;

impl RequestContext for TaskLocalRequestContext {
  fn acting_user(&self) -> Option<String> {
    ACTING_USER.try_with(|identity| identity.username.clone()).ok()
  }
}

/// Extension trait to extract the resolved identity from a request
pub trait IdentityExt {
  fn identity(&self) -> Option<Identity>;
}

impl IdentityExt for actix_web::HttpRequest {
  fn identity(&self) -> Option<Identity> {
    self.extensions().get::<Identity>().cloned()
  }
}
