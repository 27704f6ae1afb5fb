use std::sync::Arc;

use axum::{extract::State, http::StatusCode};

use super::extract::Json;
use crate::{
  model::{Reason, ValidateReq, ValidateRes},
  prelude::*,
  state::AppState,
  sv::license::Validation,
};

pub async fn health(State(app): State<Arc<AppState>>) -> Json<json::Value> {
  let database = match app.db.ping().await {
    Ok(()) => "connected",
    Err(err) => {
      warn!("Health check: database unreachable: {err}");
      "error"
    }
  };

  let licenses = match app.sv().license.counts().await {
    Ok(counts) => json::to_value(counts).unwrap_or_default(),
    Err(_) => json::Value::Null,
  };

  Json(json::json!({
    "status": "OK",
    "message": "VPN license server is running",
    "timestamp": Utc::now().to_rfc3339(),
    "database": { "status": database },
    "licenses": licenses,
  }))
}

pub async fn validate_license(
  State(app): State<Arc<AppState>>,
  Json(req): Json<ValidateReq>,
) -> Result<(StatusCode, Json<ValidateRes>)> {
  let (status, reason) =
    match app.sv().license.validate(&req.license_key).await? {
      Validation::Valid { remaining_days, email, servers } => {
        let res = ValidateRes::Valid { user: email, remaining_days, servers };
        return Ok((StatusCode::OK, Json(res)));
      }
      Validation::NotFound => (StatusCode::NOT_FOUND, Reason::NotFound),
      Validation::Expired => (StatusCode::BAD_REQUEST, Reason::Expired),
      Validation::Suspended => (StatusCode::FORBIDDEN, Reason::Suspended),
    };

  debug!("License check failed: {reason:?}");
  Ok((status, Json(ValidateRes::invalid(reason))))
}
