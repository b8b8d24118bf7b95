pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{NewUser, Session, User};
pub use errors::{AuthError, HashError, RepositoryError};
pub use ports::{
  MailMessage, Mailer, PasswordHasher, RoleRepository, SessionRepository, TokenGenerator,
  UserRepository,
};
pub use services::{AuthService, AuthSettings, SignInOutcome, SignUpDetails, SignUpOutcome, UserProfile};
pub use value_objects::{Email, Password, PasswordHash, Role, SessionToken, TokenHash, Username};
