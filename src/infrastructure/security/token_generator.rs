use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::ports::TokenGenerator;

/// Number of random bytes behind each token
const TOKEN_BYTES: usize = 32;

/// Random token generator backed by the OS CSPRNG
///
/// Tokens are base64url without padding so they can travel in query
/// strings untouched (email verification links).
#[derive(Debug, Default)]
pub struct SecureTokenGenerator;

impl SecureTokenGenerator {
  pub fn new() -> Self {
    Self
  }
}

#[async_trait]
impl TokenGenerator for SecureTokenGenerator {
  async fn generate(&self) -> Result<String, AuthError> {
    let mut token_bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut token_bytes);

    Ok(URL_SAFE_NO_PAD.encode(token_bytes))
  }
}
