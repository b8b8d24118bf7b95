use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::unit_of_work::with_connection;
use crate::domain::auth::entities::Session;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::ports::SessionRepository;

/// Database row structure for sessions table
#[derive(Debug, FromRow)]
struct SessionRow {
  id: Uuid,
  user_id: Uuid,
  token_hash: String,
  expires_at: DateTime<Utc>,
  created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
  fn from(row: SessionRow) -> Self {
    Session {
      id: row.id,
      user_id: row.user_id,
      token_hash: row.token_hash,
      expires_at: row.expires_at,
      created_at: row.created_at,
    }
  }
}

/// PostgreSQL implementation of the SessionRepository trait
pub struct PostgresSessionRepository {
  pool: PgPool,
}

impl PostgresSessionRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
  async fn create(&self, session: Session) -> Result<Session, AuthError> {
    let row = with_connection(&self.pool, |conn| {
      Box::pin(async move {
        sqlx::query_as::<_, SessionRow>(
          r#"
            INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.token_hash)
        .bind(session.expires_at)
        .bind(session.created_at)
        .fetch_one(conn)
        .await
      })
    })
    .await
    .map_err(|e| {
      tracing::error!("Failed to create session: {}", e);
      AuthError::from(e)
    })?;

    Ok(row.into())
  }

  async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, AuthError> {
    let token_hash = token_hash.to_string();

    let row = with_connection(&self.pool, |conn| {
      Box::pin(async move {
        sqlx::query_as::<_, SessionRow>(
          r#"
            SELECT id, user_id, token_hash, expires_at, created_at
            FROM sessions
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(conn)
        .await
      })
    })
    .await?;

    Ok(row.map(Into::into))
  }

  async fn delete(&self, session_id: Uuid) -> Result<(), AuthError> {
    with_connection(&self.pool, |conn| {
      Box::pin(async move {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
          .bind(session_id)
          .execute(conn)
          .await
      })
    })
    .await?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::auth::entities::{NewUser, User};
  use crate::domain::auth::ports::UserRepository;
  use crate::domain::auth::value_objects::SessionToken;
  use crate::infrastructure::persistence::postgres::PostgresUserRepository;
  use crate::infrastructure::persistence::postgres::test_db::setup_test_db;

  #[tokio::test]
  async fn test_session_lifecycle() {
    let (pool, _container) = setup_test_db().await;
    let users = PostgresUserRepository::new(pool.clone());
    let repo = PostgresSessionRepository::new(pool);

    let user = users
      .create(User::new(NewUser {
        username: "sessions".to_string(),
        email: "sessions@example.com".to_string(),
        first_name: "Session".to_string(),
        last_name: "Owner".to_string(),
        password_hash: "hash".to_string(),
      }))
      .await
      .unwrap();

    let token = SessionToken::generate();
    let session = Session::with_duration(user.id, token.hash(), chrono::Duration::hours(1));
    let created = repo.create(session).await.unwrap();

    let found = repo
      .find_by_token_hash(token.hash().as_str())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(found.id, created.id);

    repo.delete(created.id).await.unwrap();
    assert!(
      repo
        .find_by_token_hash(token.hash().as_str())
        .await
        .unwrap()
        .is_none()
    );
  }
}
