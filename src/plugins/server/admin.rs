use std::sync::Arc;

use axum::{
  extract::{FromRequestParts, State},
  http::{HeaderMap, header, request::Parts},
};

use super::extract::Json;
use crate::{
  model::{LoginReq, LoginRes, VerifyReq},
  prelude::*,
  state::AppState,
  sv::admin::Verdict,
};

/// Proof that the request carried a live admin token.
#[derive(Debug, Clone)]
pub struct AdminSession {
  pub user: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|token| !token.is_empty())
}

impl FromRequestParts<Arc<AppState>> for AdminSession {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    let token = bearer_token(&parts.headers).ok_or(Error::Unauthorized)?;

    match app.admin.verify(token) {
      Verdict { valid: true, user: Some(user) } => Ok(Self { user }),
      _ => {
        debug!("Rejected admin request to {}", parts.uri.path());
        Err(Error::Unauthorized)
      }
    }
  }
}

pub async fn login(
  State(app): State<Arc<AppState>>,
  Json(req): Json<LoginReq>,
) -> Result<Json<LoginRes>> {
  let token = app.sv().admin.login(&req.username, &req.password)?;
  Ok(Json(LoginRes { success: true, token }))
}

pub async fn verify(
  State(app): State<Arc<AppState>>,
  Json(req): Json<VerifyReq>,
) -> Json<Verdict> {
  Json(app.sv().admin.verify(&req.token))
}
