pub mod identity;
pub mod request_id;

pub use identity::{Identity, IdentityExt, IdentityMiddleware, TaskLocalRequestContext};
pub use request_id::{RequestId, RequestIdExt, RequestIdMiddleware};
