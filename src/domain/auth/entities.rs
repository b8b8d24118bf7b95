use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::TokenHash;

/// User entity representing an account in the system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  /// Unique identifier for the user
  pub id: Uuid,
  /// Login name (unique)
  pub username: String,
  /// User's email address (unique)
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  /// Hashed password using Argon2
  pub password_hash: String,
  /// Whether the user's email has been verified
  pub is_email_verified: bool,
  /// SHA-256 hash of the outstanding email verification token
  pub email_verification_token_hash: Option<String>,
  /// Expiration time for email verification token
  pub email_verification_token_expires_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Profile fields supplied at sign-up
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub password_hash: String,
}

impl User {
  /// Creates a new, unverified user
  pub fn new(details: NewUser) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      username: details.username,
      email: details.email,
      first_name: details.first_name,
      last_name: details.last_name,
      password_hash: details.password_hash,
      is_email_verified: false,
      email_verification_token_hash: None,
      email_verification_token_expires_at: None,
      created_at: now,
      updated_at: now,
    }
  }

  /// Stores the hash of a new verification token
  pub fn set_email_verification_token(&mut self, token_hash: TokenHash, expires_in: Duration) {
    self.email_verification_token_hash = Some(token_hash.into_inner());
    self.email_verification_token_expires_at = Some(Utc::now() + expires_in);
    self.updated_at = Utc::now();
  }

  /// Checks a presented verification token against the stored hash and expiry
  pub fn is_email_verification_token_valid(&self, token: &str) -> bool {
    match (
      &self.email_verification_token_hash,
      &self.email_verification_token_expires_at,
    ) {
      (Some(stored_hash), Some(expires_at)) => {
        TokenHash::of(token).as_str() == stored_hash && *expires_at > Utc::now()
      }
      _ => false,
    }
  }

  /// Marks the email as verified and clears the verification token
  pub fn verify_email(&mut self) {
    self.is_email_verified = true;
    self.email_verification_token_hash = None;
    self.email_verification_token_expires_at = None;
    self.updated_at = Utc::now();
  }
}

/// Session entity representing an authenticated client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub id: Uuid,
  pub user_id: Uuid,
  /// SHA-256 hash of the session token
  pub token_hash: String,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}

impl Session {
  pub fn with_duration(user_id: Uuid, token_hash: TokenHash, duration: Duration) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      user_id,
      token_hash: token_hash.into_inner(),
      expires_at: now + duration,
      created_at: now,
    }
  }

  pub fn is_expired(&self) -> bool {
    self.expires_at <= Utc::now()
  }
}
