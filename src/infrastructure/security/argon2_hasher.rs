use argon2::password_hash::SaltString;
use argon2::{
  Algorithm, Argon2, Params, Version,
  password_hash::{
    PasswordHash as Argon2PasswordHash, PasswordHasher as Argon2PasswordHasherTrait,
    PasswordVerifier,
  },
};
use async_trait::async_trait;

use crate::domain::auth::errors::{AuthError, HashError};
use crate::domain::auth::ports::PasswordHasher;
use crate::domain::auth::value_objects::{Password, PasswordHash};

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Cost {
  pub memory_kib: u32,
  pub iterations: u32,
  pub parallelism: u32,
}

impl Default for Argon2Cost {
  /// 19 MiB, 2 passes, 1 lane
  fn default() -> Self {
    Self {
      memory_kib: 19_456,
      iterations: 2,
      parallelism: 1,
    }
  }
}

/// Argon2id password hasher implementation
pub struct Argon2PasswordHasher {
  argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
  pub fn new() -> Result<Self, AuthError> {
    Self::with_cost(Argon2Cost::default())
  }

  pub fn with_cost(cost: Argon2Cost) -> Result<Self, AuthError> {
    let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, Some(32))
      .map_err(|e| HashError::HashingFailed(format!("Failed to create Argon2 params: {}", e)))?;

    Ok(Self {
      argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
    })
  }
}

#[async_trait]
impl PasswordHasher for Argon2PasswordHasher {
  async fn hash(&self, password: &Password) -> Result<PasswordHash, AuthError> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);

    let hash = self
      .argon2
      .hash_password(password.as_str().as_bytes(), &salt)
      .map_err(|e| HashError::HashingFailed(e.to_string()))?;

    Ok(PasswordHash::from_hash(hash.to_string())?)
  }

  /// Verifies in constant time; a mismatch is `Ok(false)`, a malformed hash an error
  async fn verify(
    &self,
    password: &Password,
    hashed_password: &PasswordHash,
  ) -> Result<bool, AuthError> {
    let parsed_hash =
      Argon2PasswordHash::new(hashed_password.as_str()).map_err(|_| HashError::InvalidFormat)?;

    match self
      .argon2
      .verify_password(password.as_str().as_bytes(), &parsed_hash)
    {
      Ok(()) => Ok(true),
      Err(argon2::password_hash::Error::Password) => Ok(false),
      Err(e) => Err(HashError::VerificationFailed(e.to_string()).into()),
    }
  }
}
