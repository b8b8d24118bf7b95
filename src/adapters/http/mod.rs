pub mod dtos;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;

// Re-export commonly used types
pub use dtos::{ErrorResponse, HealthResponse};
pub use errors::{ApiError, AuthErrorKind};
pub use handlers::account::AccountUseCases;
pub use middleware::{
  Identity, IdentityExt, IdentityMiddleware, RequestId, RequestIdExt, RequestIdMiddleware,
  TaskLocalRequestContext,
};
pub use routes::{configure_account_routes, configure_health_routes, configure_user_routes};
