//! Error types for the license server

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use sea_orm::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Database error: {0}")]
  Database(#[from] DbErr),

  #[error("License not found")]
  LicenseNotFound,

  #[error("Server not found")]
  ServerNotFound,

  #[error("User not found")]
  UserNotFound,

  #[error("License key already issued")]
  DuplicateKey,

  #[error("Payment reference already redeemed")]
  DuplicatePayment,

  #[error("No free license key after {0} attempts")]
  KeySpaceExhausted(u32),

  #[error("Invalid credentials")]
  InvalidCredentials,

  #[error("Unauthorized")]
  Unauthorized,

  #[error("Rejected webhook: {0}")]
  Webhook(&'static str),

  #[error("Webhook is not configured")]
  WebhookDisabled,

  #[error("Invalid arguments: {0}")]
  InvalidArgs(String),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl Error {
  fn status(&self) -> StatusCode {
    match self {
      Error::LicenseNotFound | Error::ServerNotFound | Error::UserNotFound => {
        StatusCode::NOT_FOUND
      }
      Error::DuplicateKey | Error::DuplicatePayment => StatusCode::CONFLICT,
      Error::InvalidCredentials | Error::Unauthorized => {
        StatusCode::UNAUTHORIZED
      }
      Error::Webhook(_) | Error::InvalidArgs(_) => StatusCode::BAD_REQUEST,
      Error::WebhookDisabled => StatusCode::SERVICE_UNAVAILABLE,
      Error::Database(_) | Error::KeySpaceExhausted(_) | Error::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();

    // internals stay in the log
    let message = match &self {
      Error::Database(err) => {
        tracing::error!("Database error: {err}");
        "Database error".to_string()
      }
      Error::KeySpaceExhausted(_) | Error::Internal(_) => {
        tracing::error!("{self}");
        "Internal error".to_string()
      }
      other => other.to_string(),
    };

    let body = json::json!({
      "success": false,
      "error": message
    });

    (status, axum::Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
