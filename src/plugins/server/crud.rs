//! Admin resources. Every handler takes an [`AdminSession`] first, so a
//! missing or stale token is rejected before the body is read.

use std::sync::Arc;

use axum::extract::{Path, State};
use serde::Deserialize;

use super::{
  AdminSession,
  extract::{Json, Query},
};
use crate::{
  entity::{
    license::{self, Plan},
    server, user,
  },
  model::Deleted,
  prelude::*,
  state::AppState,
  store::LicensePatch,
  sv::{
    server::{NewServer, ServerPatch},
    user::{NewUser, UserPatch},
  },
};

type App = State<Arc<AppState>>;

#[derive(Debug, Deserialize)]
pub struct NewLicense {
  pub email: String,
  #[serde(default)]
  pub plan: Plan,
  #[serde(
    rename = "expiryDate",
    default,
    with = "crate::utils::timestamp::option"
  )]
  pub expires_at: Option<DateTime>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
  pub license_key: Option<String>,
}

pub async fn licenses(
  _: AdminSession,
  State(app): App,
) -> Result<Json<Vec<license::Model>>> {
  Ok(Json(app.sv().license.all().await?))
}

pub async fn license(
  _: AdminSession,
  State(app): App,
  Path(id): Path<String>,
) -> Result<Json<license::Model>> {
  Ok(Json(app.sv().license.by_id(&id).await?))
}

pub async fn create_license(
  _: AdminSession,
  State(app): App,
  Json(req): Json<NewLicense>,
) -> Result<Json<license::Model>> {
  let license =
    app.sv().license.create(&req.email, req.plan, req.expires_at).await?;
  Ok(Json(license))
}

pub async fn update_license(
  _: AdminSession,
  State(app): App,
  Path(id): Path<String>,
  Json(patch): Json<LicensePatch>,
) -> Result<Json<license::Model>> {
  Ok(Json(app.sv().license.update(&id, patch).await?))
}

pub async fn suspend_license(
  _: AdminSession,
  State(app): App,
  Path(id): Path<String>,
) -> Result<Json<license::Model>> {
  Ok(Json(app.sv().license.suspend(&id).await?))
}

pub async fn reactivate_license(
  _: AdminSession,
  State(app): App,
  Path(id): Path<String>,
) -> Result<Json<license::Model>> {
  Ok(Json(app.sv().license.reactivate(&id).await?))
}

pub async fn delete_license(
  session: AdminSession,
  State(app): App,
  Path(id): Path<String>,
) -> Result<Json<Deleted>> {
  app.sv().license.delete(&id).await?;
  info!("License {id} deleted by `{}`", session.user);
  Ok(Json(Deleted::new("License deleted")))
}

pub async fn servers(
  _: AdminSession,
  State(app): App,
) -> Result<Json<Vec<server::Model>>> {
  Ok(Json(app.sv().server.all().await?))
}

pub async fn create_server(
  _: AdminSession,
  State(app): App,
  Json(req): Json<NewServer>,
) -> Result<Json<server::Model>> {
  Ok(Json(app.sv().server.create(req).await?))
}

pub async fn update_server(
  _: AdminSession,
  State(app): App,
  Path(id): Path<String>,
  Json(patch): Json<ServerPatch>,
) -> Result<Json<server::Model>> {
  Ok(Json(app.sv().server.update(&id, patch).await?))
}

pub async fn delete_server(
  _: AdminSession,
  State(app): App,
  Path(id): Path<String>,
) -> Result<Json<Deleted>> {
  app.sv().server.delete(&id).await?;
  Ok(Json(Deleted::new("Server deleted")))
}

pub async fn users(
  _: AdminSession,
  State(app): App,
  Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<user::Model>>> {
  let sv = app.sv();
  let users = match filter.license_key {
    Some(key) => sv.user.by_license(&key).await?,
    None => sv.user.all().await?,
  };
  Ok(Json(users))
}

pub async fn create_user(
  _: AdminSession,
  State(app): App,
  Json(req): Json<NewUser>,
) -> Result<Json<user::Model>> {
  Ok(Json(app.sv().user.create(req).await?))
}

pub async fn update_user(
  _: AdminSession,
  State(app): App,
  Path(id): Path<String>,
  Json(patch): Json<UserPatch>,
) -> Result<Json<user::Model>> {
  Ok(Json(app.sv().user.update(&id, patch).await?))
}

pub async fn delete_user(
  _: AdminSession,
  State(app): App,
  Path(id): Path<String>,
) -> Result<Json<Deleted>> {
  app.sv().user.delete(&id).await?;
  Ok(Json(Deleted::new("User deleted")))
}
