pub mod role_repository;
pub mod session_repository;
pub mod unit_of_work;
pub mod user_repository;

#[cfg(test)]
mod test_db;

pub use role_repository::PostgresRoleRepository;
pub use session_repository::PostgresSessionRepository;
pub use unit_of_work::{PgUnitOfWork, PgUnitOfWorkProvider, with_connection};
pub use user_repository::PostgresUserRepository;
