mod admin;
mod crud;
mod extract;
mod handlers;
mod webhook;

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
  Router,
  routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

pub use admin::AdminSession;

use crate::{prelude::*, state::AppState};

pub struct Plugin;

/// All routes, without the network-facing middleware.
pub fn routes() -> Router<Arc<AppState>> {
  Router::new()
    .route("/health", get(handlers::health))
    .route("/api/validate-license", post(handlers::validate_license))
    .route("/api/webhook", post(webhook::stripe))
    .route("/api/admin/login", post(admin::login))
    .route("/api/admin/verify", post(admin::verify))
    .route("/api/licenses", get(crud::licenses).post(crud::create_license))
    .route(
      "/api/licenses/{id}",
      get(crud::license)
        .put(crud::update_license)
        .delete(crud::delete_license),
    )
    .route("/api/licenses/{id}/suspend", post(crud::suspend_license))
    .route("/api/licenses/{id}/reactivate", post(crud::reactivate_license))
    .route("/api/servers", get(crud::servers).post(crud::create_server))
    .route(
      "/api/servers/{id}",
      put(crud::update_server).delete(crud::delete_server),
    )
    .route("/api/users", get(crud::users).post(crud::create_user))
    .route("/api/users/{id}", put(crud::update_user).delete(crud::delete_user))
}

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(app.config.rate_per_second)
        .burst_size(app.config.rate_burst)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let limiter = governor_conf.limiter().clone();

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));

    let router = routes()
      .layer(
        ServiceBuilder::new()
          .layer(TraceLayer::new_for_http())
          .layer(GovernorLayer::new(governor_conf))
          .layer(
            CorsLayer::new()
              .allow_origin(Any)
              .allow_methods(Any)
              .allow_headers(Any),
          ),
      )
      .with_state(app)
      .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP Server listening on {addr}");

    let limiter = async {
      loop {
        time::sleep(Duration::from_secs(60)).await;
        limiter.retain_recent();
      }
    };

    let server = async {
      axum::serve(listener, router).await.context("Axum server error")
    };

    tokio::select! {
      result = server => {
        match &result {
            Ok(_) => info!("Server stopped gracefully"),
            Err(err) => error!("Server stopped with error: {err}"),
        }
        result
      }
      _ = limiter => {
        error!("Rate limiter cleaner stopped unexpectedly!");
        Ok(())
      }
    }
  }
}
