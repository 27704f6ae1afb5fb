//! Body and query extractors whose rejections use the crate error shape
//! instead of axum's plain-text 4xx.

use axum::{
  extract::{FromRequest, FromRequestParts, Request},
  http::request::Parts,
  response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::prelude::*;

#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
  S: Send + Sync,
  T: DeserializeOwned,
{
  type Rejection = Error;

  async fn from_request(req: Request, state: &S) -> Result<Self> {
    let axum::Json(value) = axum::Json::<T>::from_request(req, state)
      .await
      .map_err(|rejection| Error::InvalidArgs(rejection.body_text()))?;
    Ok(Json(value))
  }
}

impl<T: Serialize> IntoResponse for Json<T> {
  fn into_response(self) -> Response {
    axum::Json(self.0).into_response()
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

impl<S, T> FromRequestParts<S> for Query<T>
where
  S: Send + Sync,
  T: DeserializeOwned,
{
  type Rejection = Error;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
    let axum::extract::Query(value) =
      axum::extract::Query::<T>::from_request_parts(parts, state)
        .await
        .map_err(|rejection| Error::InvalidArgs(rejection.body_text()))?;
    Ok(Query(value))
  }
}
