use async_trait::async_trait;
use uuid::Uuid;

use super::entities::{Session, User};
use super::errors::AuthError;
use super::value_objects::{Email, Password, PasswordHash, Role, Username};

/// Repository trait for user persistence operations
#[async_trait]
pub trait UserRepository: Send + Sync {
  /// Creates a new user in the repository
  async fn create(&self, user: User) -> Result<User, AuthError>;

  /// Finds a user by their unique identifier
  async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;

  /// Finds a user by their login name
  async fn find_by_username(&self, username: &Username) -> Result<Option<User>, AuthError>;

  /// Finds a user by their email address
  async fn find_by_email(&self, email: &Email) -> Result<Option<User>, AuthError>;

  /// Updates an existing user
  async fn update(&self, user: User) -> Result<User, AuthError>;
}

/// Repository trait for roles and role membership
#[async_trait]
pub trait RoleRepository: Send + Sync {
  /// Creates the role if it does not exist yet
  async fn ensure_exists(&self, role: Role) -> Result<(), AuthError>;

  /// Grants a role to a user
  async fn assign(&self, user_id: Uuid, role: Role) -> Result<(), AuthError>;

  /// Lists the roles granted to a user
  async fn roles_for(&self, user_id: Uuid) -> Result<Vec<Role>, AuthError>;
}

/// Repository trait for session persistence operations
#[async_trait]
pub trait SessionRepository: Send + Sync {
  async fn create(&self, session: Session) -> Result<Session, AuthError>;

  async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, AuthError>;

  async fn delete(&self, session_id: Uuid) -> Result<(), AuthError>;
}

/// Service trait for password hashing operations
#[async_trait]
pub trait PasswordHasher: Send + Sync {
  async fn hash(&self, password: &Password) -> Result<PasswordHash, AuthError>;

  async fn verify(
    &self,
    password: &Password,
    hashed_password: &PasswordHash,
  ) -> Result<bool, AuthError>;
}

/// Service trait for secure token generation
#[async_trait]
pub trait TokenGenerator: Send + Sync {
  /// Generates a URL-safe, cryptographically secure random token
  async fn generate(&self) -> Result<String, AuthError>;
}

/// Outgoing email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
  pub to: String,
  pub subject: String,
  pub body: String,
}

/// Mail delivery backend
#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, message: MailMessage) -> Result<(), AuthError>;
}
