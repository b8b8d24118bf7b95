//! Account use cases
//!
//! Each use case describes its call (target and captured arguments) and
//! runs the business operation through the pipeline built for it.

mod confirm_email;
mod get_user_by_username;
mod sign_in;
mod sign_up;

pub use confirm_email::{ConfirmEmailCommand, ConfirmEmailResponse, ConfirmEmailUseCase};
pub use get_user_by_username::{GetUserByUsernameUseCase, UserResponse};
pub use sign_in::{SignInCommand, SignInResponse, SignInUseCase};
pub use sign_up::{SignUpCommand, SignUpResponse, SignUpUseCase};

use super::aspects::RuleSetRegistry;

/// Rule sets referenced by the account pipelines
pub fn auth_rule_sets() -> RuleSetRegistry {
  RuleSetRegistry::new()
    .register::<SignUpCommand>("sign_up", "command")
    .register::<SignInCommand>("sign_in", "command")
}
