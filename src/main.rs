use actix_web::{App, HttpServer, middleware::Logger, web};
use config::ConfigError;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

use starterkit::{
  adapters::http::{
    AccountUseCases, RequestIdMiddleware, TaskLocalRequestContext, configure_account_routes,
    configure_health_routes, configure_user_routes,
  },
  application::auth::{
    ConfirmEmailUseCase, GetUserByUsernameUseCase, SignInUseCase, SignUpUseCase, auth_rule_sets,
  },
  application::pipelines::{
    AspectFactory, AspectPorts, AspectSettings, CONFIRM_EMAIL_ASPECTS, GET_USER_ASPECTS,
    SIGN_IN_ASPECTS, SIGN_UP_ASPECTS,
  },
  domain::auth::{AuthService, AuthSettings, Role},
  domain::interception::PipelineError,
  infrastructure::{
    config::Config,
    logging::{TracingDiagnosticSink, TracingStructuredLogger, init_tracing},
    mail::LogMailer,
    persistence::postgres::{
      PgUnitOfWorkProvider, PostgresRoleRepository, PostgresSessionRepository,
      PostgresUserRepository,
    },
    security::{Argon2PasswordHasher, SecureTokenGenerator},
  },
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  // Initialize environment variables from .env file
  dotenvy::dotenv().ok();

  let config = Config::load().map_err(|e| {
    eprintln!("Failed to load configuration: {}", e);
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
  })?;

  init_tracing(&config.logging);
  tracing::info!("Starting starterkit");

  // Set up database connection pool with timeout
  tracing::info!("Connecting to database");

  let db_pool = tokio::time::timeout(
    Duration::from_secs(config.database.connect_timeout_seconds),
    PgPoolOptions::new()
      .max_connections(config.database.max_connections)
      .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
      .connect(&config.database.url),
  )
  .await
  .map_err(|_| {
    tracing::error!(
      "Database connection timed out after {} seconds. Is PostgreSQL running?",
      config.database.connect_timeout_seconds
    );
    std::io::Error::new(
      std::io::ErrorKind::TimedOut,
      format!(
        "Database connection timed out after {} seconds",
        config.database.connect_timeout_seconds
      ),
    )
  })?
  .map_err(|e| {
    tracing::error!("Failed to connect to database: {}", e);
    match e {
      sqlx::Error::Io(_) => std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "Could not connect to database. Is PostgreSQL running?",
      ),
      _ => std::io::Error::other(format!("Database error: {}", e)),
    }
  })?;

  tracing::info!("Running database migrations");
  sqlx::migrate!("./migrations")
    .run(&db_pool)
    .await
    .map_err(|e| std::io::Error::other(format!("Failed to run migrations: {}", e)))?;

  let session_ttl = config.security.session_ttl().map_err(invalid_config)?;
  let email_verification_ttl = config
    .security
    .email_verification_ttl()
    .map_err(invalid_config)?;
  let performance_threshold = config
    .aspects
    .performance_threshold()
    .map_err(invalid_config)?;

  // Domain service
  let password_hasher = Argon2PasswordHasher::new().map_err(|e| std::io::Error::other(e.to_string()))?;
  let auth_service = Arc::new(AuthService::new(
    Arc::new(PostgresUserRepository::new(db_pool.clone())),
    Arc::new(PostgresRoleRepository::new(db_pool.clone())),
    Arc::new(PostgresSessionRepository::new(db_pool.clone())),
    Arc::new(password_hasher),
    Arc::new(SecureTokenGenerator::new()),
    Arc::new(LogMailer),
    AuthSettings {
      base_url: config.server.base_url.clone(),
      session_ttl,
      email_verification_ttl,
    },
  ));

  // Interceptor pipelines
  let factory = AspectFactory::new(
    AspectPorts {
      unit_of_work: Arc::new(
        PgUnitOfWorkProvider::new().with_context(config.database.context_name.clone(), db_pool),
      ),
      rule_sets: Arc::new(auth_rule_sets()),
      logger: Arc::new(TracingStructuredLogger),
      request_context: Arc::new(TaskLocalRequestContext),
      diagnostics: Arc::new(TracingDiagnosticSink),
    },
    AspectSettings {
      persistence_context: config.database.context_name.clone(),
      transaction_strategy: config.aspects.transaction_strategy,
      performance_threshold,
      audit_entry_logging: config.aspects.audit_entry_logging,
      sensitive_fields: config.aspects.sensitive_fields.clone(),
    },
  );

  let use_cases = web::Data::new(
    account_use_cases(&factory, auth_service.clone()).map_err(|e| {
      tracing::error!("Invalid aspect configuration: {}", e);
      std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?,
  );

  let server_host = config.server.host.clone();
  let server_port = config.server.port;
  tracing::info!("Listening on {}:{}", server_host, server_port);

  HttpServer::new(move || {
    App::new()
      .wrap(Logger::default())
      .wrap(RequestIdMiddleware::new())
      .configure(|cfg| configure_account_routes(cfg, use_cases.clone(), auth_service.clone()))
      .configure(|cfg| configure_user_routes(cfg, use_cases.clone(), auth_service.clone()))
      .configure(configure_health_routes)
  })
  .bind((server_host.as_str(), server_port))?
  .run()
  .await
}

fn account_use_cases(
  factory: &AspectFactory,
  auth_service: Arc<AuthService>,
) -> Result<AccountUseCases, PipelineError> {
  Ok(AccountUseCases {
    sign_up_user: Arc::new(SignUpUseCase::new(
      auth_service.clone(),
      factory.pipeline(SIGN_UP_ASPECTS)?,
      Role::User,
    )),
    sign_up_admin: Arc::new(SignUpUseCase::new(
      auth_service.clone(),
      factory.pipeline(SIGN_UP_ASPECTS)?,
      Role::Admin,
    )),
    sign_in: Arc::new(SignInUseCase::new(
      auth_service.clone(),
      factory.pipeline(SIGN_IN_ASPECTS)?,
    )),
    confirm_email: Arc::new(ConfirmEmailUseCase::new(
      auth_service.clone(),
      factory.pipeline(CONFIRM_EMAIL_ASPECTS)?,
    )),
    get_user: Arc::new(GetUserByUsernameUseCase::new(
      auth_service,
      factory.pipeline(GET_USER_ASPECTS)?,
    )),
  })
}

fn invalid_config(e: ConfigError) -> std::io::Error {
  tracing::error!("Invalid configuration: {}", e);
  std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
}
