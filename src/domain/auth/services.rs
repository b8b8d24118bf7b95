use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use super::entities::{NewUser, Session, User};
use super::errors::{AuthError, RepositoryError};
use super::ports::{
  MailMessage, Mailer, PasswordHasher, RoleRepository, SessionRepository, TokenGenerator,
  UserRepository,
};
use super::value_objects::{Email, Password, Role, SessionToken, TokenHash, Username};

const VERIFICATION_EMAIL_TEMPLATE: &str =
  include_str!("../../../mail_templates/verification_email.html");
const VERIFICATION_URL_PLACEHOLDER: &str = "[verificationUrl]";
const VERIFICATION_EMAIL_SUBJECT: &str = "Please verify your email";

/// Tunables for the authentication service
#[derive(Debug, Clone)]
pub struct AuthSettings {
  /// Public base URL used to build links in outgoing mail
  pub base_url: String,
  pub session_ttl: Duration,
  pub email_verification_ttl: Duration,
}

impl Default for AuthSettings {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8080".to_string(),
      session_ttl: Duration::hours(24),
      email_verification_ttl: Duration::hours(24),
    }
  }
}

/// Sign-up input, already parsed into value objects
#[derive(Debug, Clone)]
pub struct SignUpDetails {
  pub username: Username,
  pub email: Email,
  pub first_name: String,
  pub last_name: String,
  pub password: Password,
}

#[derive(Debug, Clone)]
pub struct SignUpOutcome {
  pub user: User,
  /// Link that confirms the new account's email
  pub verification_url: String,
}

#[derive(Debug, Clone)]
pub struct SignInOutcome {
  pub user: User,
  pub roles: Vec<Role>,
  pub session: Session,
  pub token: SessionToken,
}

#[derive(Debug, Clone)]
pub struct UserProfile {
  pub user: User,
  pub roles: Vec<Role>,
}

/// Authentication service implementing core business logic
pub struct AuthService {
  user_repo: Arc<dyn UserRepository>,
  role_repo: Arc<dyn RoleRepository>,
  session_repo: Arc<dyn SessionRepository>,
  password_hasher: Arc<dyn PasswordHasher>,
  token_generator: Arc<dyn TokenGenerator>,
  mailer: Arc<dyn Mailer>,
  settings: AuthSettings,
}

impl AuthService {
  pub fn new(
    user_repo: Arc<dyn UserRepository>,
    role_repo: Arc<dyn RoleRepository>,
    session_repo: Arc<dyn SessionRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    token_generator: Arc<dyn TokenGenerator>,
    mailer: Arc<dyn Mailer>,
    settings: AuthSettings,
  ) -> Self {
    Self {
      user_repo,
      role_repo,
      session_repo,
      password_hasher,
      token_generator,
      mailer,
      settings,
    }
  }

  /// Registers a new account with the given role and mails a verification link
  ///
  /// # Errors
  /// Returns `AuthError::UsernameAlreadyExists` or `AuthError::EmailAlreadyExists`
  /// when either identifier is taken.
  pub async fn sign_up(&self, details: SignUpDetails, role: Role) -> Result<SignUpOutcome, AuthError> {
    if self
      .user_repo
      .find_by_username(&details.username)
      .await?
      .is_some()
    {
      return Err(AuthError::UsernameAlreadyExists);
    }

    if self.user_repo.find_by_email(&details.email).await?.is_some() {
      return Err(AuthError::EmailAlreadyExists);
    }

    let password_hash = self.password_hasher.hash(&details.password).await?;

    let mut user = User::new(NewUser {
      username: details.username.into_inner(),
      email: details.email.into_inner(),
      first_name: details.first_name,
      last_name: details.last_name,
      password_hash: password_hash.into_inner(),
    });

    let verification_token = self.token_generator.generate().await?;
    user.set_email_verification_token(
      TokenHash::of(&verification_token),
      self.settings.email_verification_ttl,
    );

    let created_user = match self.user_repo.create(user).await {
      Ok(user) => user,
      Err(AuthError::Repository(RepositoryError::DuplicateKey(detail))) => {
        return Err(if detail.contains("email") {
          AuthError::EmailAlreadyExists
        } else {
          AuthError::UsernameAlreadyExists
        });
      }
      Err(e) => return Err(e),
    };

    self.role_repo.ensure_exists(role).await?;
    self.role_repo.assign(created_user.id, role).await?;

    let verification_url = self.verification_url(created_user.id, &verification_token);
    self
      .mailer
      .send(MailMessage {
        to: created_user.email.clone(),
        subject: VERIFICATION_EMAIL_SUBJECT.to_string(),
        body: VERIFICATION_EMAIL_TEMPLATE.replace(VERIFICATION_URL_PLACEHOLDER, &verification_url),
      })
      .await?;

    tracing::info!(user_id = %created_user.id, role = %role, "User signed up");

    Ok(SignUpOutcome {
      user: created_user,
      verification_url,
    })
  }

  /// Confirms a user's email with the token from the verification link
  pub async fn confirm_email(&self, user_id: Uuid, token: &str) -> Result<User, AuthError> {
    let mut user = self
      .user_repo
      .find_by_id(user_id)
      .await?
      .ok_or(AuthError::UserNotFound)?;

    if user.is_email_verified {
      return Err(AuthError::EmailAlreadyVerified);
    }

    if !user.is_email_verification_token_valid(token) {
      return Err(AuthError::InvalidVerificationToken);
    }

    user.verify_email();
    self.user_repo.update(user).await
  }

  /// Authenticates by username and password and opens a session
  ///
  /// # Errors
  /// Returns `AuthError::InvalidCredentials` for an unknown user or a wrong
  /// password, without distinguishing the two.
  pub async fn sign_in(
    &self,
    username: Username,
    password: Password,
  ) -> Result<SignInOutcome, AuthError> {
    let user = self
      .user_repo
      .find_by_username(&username)
      .await?
      .ok_or(AuthError::InvalidCredentials)?;

    let password_hash = super::value_objects::PasswordHash::from_hash(&user.password_hash)?;
    if !self.password_hasher.verify(&password, &password_hash).await? {
      return Err(AuthError::InvalidCredentials);
    }

    let token = SessionToken::generate();
    let session = Session::with_duration(user.id, token.hash(), self.settings.session_ttl);
    let session = self.session_repo.create(session).await?;
    let roles = self.role_repo.roles_for(user.id).await?;

    Ok(SignInOutcome {
      user,
      roles,
      session,
      token,
    })
  }

  /// Resolves the user behind a session token
  ///
  /// Expired sessions are deleted and reported as invalid.
  pub async fn validate_session(&self, token: &SessionToken) -> Result<User, AuthError> {
    let session = self
      .session_repo
      .find_by_token_hash(token.hash().as_str())
      .await?
      .ok_or(AuthError::InvalidSession)?;

    if session.is_expired() {
      self.session_repo.delete(session.id).await?;
      return Err(AuthError::InvalidSession);
    }

    self
      .user_repo
      .find_by_id(session.user_id)
      .await?
      .ok_or(AuthError::UserNotFound)
  }

  pub async fn find_by_username(&self, username: &Username) -> Result<UserProfile, AuthError> {
    let user = self
      .user_repo
      .find_by_username(username)
      .await?
      .ok_or(AuthError::UserNotFound)?;
    let roles = self.role_repo.roles_for(user.id).await?;

    Ok(UserProfile { user, roles })
  }

  fn verification_url(&self, user_id: Uuid, token: &str) -> String {
    format!(
      "{}/api/account/confirm-email?userId={}&verificationToken={}",
      self.settings.base_url.trim_end_matches('/'),
      user_id,
      token
    )
  }
}
