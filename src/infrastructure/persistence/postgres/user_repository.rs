use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::unit_of_work::with_connection;
use crate::domain::auth::{
  entities::User,
  errors::{AuthError, RepositoryError},
  ports::UserRepository,
  value_objects::{Email, Username},
};

const USER_COLUMNS: &str = r#"
    id,
    username,
    email,
    first_name,
    last_name,
    password_hash,
    is_email_verified,
    email_verification_token_hash,
    email_verification_token_expires_at,
    created_at,
    updated_at
"#;

/// PostgreSQL implementation of the UserRepository trait
pub struct PostgresUserRepository {
  pool: PgPool,
}

impl PostgresUserRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn find_one(&self, column: &'static str, value: String) -> Result<Option<User>, AuthError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");

    let row = with_connection(&self.pool, |conn| {
      Box::pin(async move {
        sqlx::query_as::<_, UserRow>(&sql)
          .bind(value)
          .fetch_optional(conn)
          .await
      })
    })
    .await?;

    Ok(row.map(Into::into))
  }
}

/// Database row structure for users table
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
  id: Uuid,
  username: String,
  email: String,
  first_name: String,
  last_name: String,
  password_hash: String,
  is_email_verified: bool,
  email_verification_token_hash: Option<String>,
  email_verification_token_expires_at: Option<DateTime<Utc>>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
  fn from(row: UserRow) -> Self {
    User {
      id: row.id,
      username: row.username,
      email: row.email,
      first_name: row.first_name,
      last_name: row.last_name,
      password_hash: row.password_hash,
      is_email_verified: row.is_email_verified,
      email_verification_token_hash: row.email_verification_token_hash,
      email_verification_token_expires_at: row.email_verification_token_expires_at,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
  async fn create(&self, user: User) -> Result<User, AuthError> {
    let sql = format!(
      r#"
            INSERT INTO users (
                id, username, email, first_name, last_name, password_hash,
                is_email_verified, email_verification_token_hash,
                email_verification_token_expires_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {USER_COLUMNS}
            "#
    );

    let row = with_connection(&self.pool, |conn| {
      Box::pin(async move {
        sqlx::query_as::<_, UserRow>(&sql)
          .bind(user.id)
          .bind(user.username)
          .bind(user.email)
          .bind(user.first_name)
          .bind(user.last_name)
          .bind(user.password_hash)
          .bind(user.is_email_verified)
          .bind(user.email_verification_token_hash)
          .bind(user.email_verification_token_expires_at)
          .bind(user.created_at)
          .bind(user.updated_at)
          .fetch_one(conn)
          .await
      })
    })
    .await?;

    Ok(row.into())
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

    let row = with_connection(&self.pool, |conn| {
      Box::pin(async move {
        sqlx::query_as::<_, UserRow>(&sql)
          .bind(id)
          .fetch_optional(conn)
          .await
      })
    })
    .await?;

    Ok(row.map(Into::into))
  }

  async fn find_by_username(&self, username: &Username) -> Result<Option<User>, AuthError> {
    self.find_one("username", username.as_str().to_string()).await
  }

  async fn find_by_email(&self, email: &Email) -> Result<Option<User>, AuthError> {
    self.find_one("email", email.as_str().to_string()).await
  }

  async fn update(&self, user: User) -> Result<User, AuthError> {
    let sql = format!(
      r#"
            UPDATE users
            SET
                email = $2,
                first_name = $3,
                last_name = $4,
                password_hash = $5,
                is_email_verified = $6,
                email_verification_token_hash = $7,
                email_verification_token_expires_at = $8,
                updated_at = $9
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
    );

    let result = with_connection(&self.pool, |conn| {
      Box::pin(async move {
        sqlx::query_as::<_, UserRow>(&sql)
          .bind(user.id)
          .bind(user.email)
          .bind(user.first_name)
          .bind(user.last_name)
          .bind(user.password_hash)
          .bind(user.is_email_verified)
          .bind(user.email_verification_token_hash)
          .bind(user.email_verification_token_expires_at)
          .bind(user.updated_at)
          .fetch_one(conn)
          .await
      })
    })
    .await;

    match result {
      Ok(row) => Ok(row.into()),
      Err(sqlx::Error::RowNotFound) => Err(AuthError::Repository(RepositoryError::NotFound)),
      Err(e) => Err(e.into()),
    }
  }
}
