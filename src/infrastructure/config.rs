use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::application::aspects::TransactionStrategy;

fn default_db_connect_timeout() -> u64 {
  5
}

fn default_db_acquire_timeout() -> u64 {
  3
}

fn default_log_filter() -> String {
  "starterkit=debug,actix_web=info".to_string()
}

fn default_performance_threshold() -> f64 {
  5.0
}

fn default_sensitive_fields() -> Vec<String> {
  vec!["password".to_string(), "verification_token".to_string()]
}

fn default_transaction_strategy() -> TransactionStrategy {
  TransactionStrategy::AmbientScope
}

fn default_persistence_context() -> String {
  "default".to_string()
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub server: ServerConfig,
  pub database: DatabaseConfig,
  pub security: SecurityConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
  #[serde(default)]
  pub aspects: AspectsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host: String,
  pub port: u16,
  /// Public URL prefix used in links sent by email
  pub base_url: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
  pub url: String,
  pub max_connections: u32,
  #[serde(default = "default_db_connect_timeout")]
  pub connect_timeout_seconds: u64,
  #[serde(default = "default_db_acquire_timeout")]
  pub acquire_timeout_seconds: u64,
  /// Name under which the pool is registered as a persistence context
  #[serde(default = "default_persistence_context")]
  pub context_name: String,
}

/// Security configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
  pub session_ttl_seconds: u64,
  pub email_verification_ttl_seconds: u64,
}

impl SecurityConfig {
  pub fn session_ttl(&self) -> Result<chrono::Duration, ConfigError> {
    ttl("security.session_ttl_seconds", self.session_ttl_seconds)
  }

  pub fn email_verification_ttl(&self) -> Result<chrono::Duration, ConfigError> {
    ttl(
      "security.email_verification_ttl_seconds",
      self.email_verification_ttl_seconds,
    )
  }
}

fn ttl(key: &str, seconds: u64) -> Result<chrono::Duration, ConfigError> {
  i64::try_from(seconds)
    .ok()
    .and_then(chrono::Duration::try_seconds)
    .ok_or_else(|| ConfigError::Message(format!("{} is out of range: {}", key, seconds)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
  #[default]
  Pretty,
  Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// `EnvFilter` directives, overridden by `RUST_LOG`
  #[serde(default = "default_log_filter")]
  pub filter: String,
  #[serde(default)]
  pub format: LogFormat,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      filter: default_log_filter(),
      format: LogFormat::default(),
    }
  }
}

/// Settings shared by the interceptors
#[derive(Debug, Clone, Deserialize)]
pub struct AspectsConfig {
  /// Calls slower than this are reported
  #[serde(default = "default_performance_threshold")]
  pub performance_threshold_seconds: f64,
  /// Emit an info record on entry to audited operations
  #[serde(default)]
  pub audit_entry_logging: bool,
  /// Argument fields replaced with `***` in log records
  #[serde(default = "default_sensitive_fields")]
  pub sensitive_fields: Vec<String>,
  /// `ambient_scope` or `context_bound`
  #[serde(default = "default_transaction_strategy")]
  pub transaction_strategy: TransactionStrategy,
}

impl Default for AspectsConfig {
  fn default() -> Self {
    Self {
      performance_threshold_seconds: default_performance_threshold(),
      audit_entry_logging: false,
      sensitive_fields: default_sensitive_fields(),
      transaction_strategy: default_transaction_strategy(),
    }
  }
}

impl AspectsConfig {
  /// Negative values mean every call is reported
  pub fn performance_threshold(&self) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(self.performance_threshold_seconds.max(0.0)).map_err(|e| {
      ConfigError::Message(format!(
        "aspects.performance_threshold_seconds is out of range: {}",
        e
      ))
    })
  }
}

impl Config {
  /// Load configuration from files and environment variables
  ///
  /// Later sources override earlier ones:
  /// 1. config/default.toml
  /// 2. config/local.toml (if exists)
  /// 3. config/{RUN_MODE}.toml (if exists)
  /// 4. Environment variables with the STARTERKIT_ prefix, double underscore
  ///    between levels: `STARTERKIT_SERVER__PORT=8080`,
  ///    `STARTERKIT_ASPECTS__PERFORMANCE_THRESHOLD_SECONDS=2.5`
  pub fn load() -> Result<Self, ConfigError> {
    let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    let config = ConfigBuilder::builder()
      .add_source(File::with_name("config/default").required(true))
      .add_source(File::with_name("config/local").required(false))
      .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
      .add_source(
        Environment::with_prefix("STARTERKIT")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?;

    config.try_deserialize()
  }
}
