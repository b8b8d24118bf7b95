use async_trait::async_trait;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use super::unit_of_work::with_connection;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::ports::RoleRepository;
use crate::domain::auth::value_objects::Role;

/// PostgreSQL implementation of the RoleRepository trait
pub struct PostgresRoleRepository {
  pool: PgPool,
}

impl PostgresRoleRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
  async fn ensure_exists(&self, role: Role) -> Result<(), AuthError> {
    with_connection(&self.pool, |conn| {
      Box::pin(async move {
        sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
          .bind(role.as_str())
          .execute(conn)
          .await
      })
    })
    .await?;

    Ok(())
  }

  async fn assign(&self, user_id: Uuid, role: Role) -> Result<(), AuthError> {
    with_connection(&self.pool, |conn| {
      Box::pin(async move {
        sqlx::query(
          "INSERT INTO user_roles (user_id, role_name) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(conn)
        .await
      })
    })
    .await?;

    Ok(())
  }

  async fn roles_for(&self, user_id: Uuid) -> Result<Vec<Role>, AuthError> {
    let names: Vec<String> = with_connection(&self.pool, |conn| {
      Box::pin(async move {
        sqlx::query_scalar::<_, String>(
          "SELECT role_name FROM user_roles WHERE user_id = $1 ORDER BY role_name",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await
      })
    })
    .await?;

    names
      .iter()
      .map(|name| Role::from_str(name).map_err(AuthError::from))
      .collect()
  }
}
