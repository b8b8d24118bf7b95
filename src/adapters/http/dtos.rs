use serde::Serialize;

/// Standard error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
  /// Error type/code
  pub error: String,

  /// Human-readable error message
  pub message: String,

  /// Optional detailed error information
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
  pub status: &'static str,
  pub version: &'static str,
}

impl HealthResponse {
  pub fn ok() -> Self {
    Self {
      status: "ok",
      version: env!("CARGO_PKG_VERSION"),
    }
  }
}
