use reqwest::StatusCode;

use crate::{
  model::{ValidateReq, ValidateRes},
  prelude::*,
};

/// Failures that say nothing about the license itself. All of them are
/// retried later and never touch the cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("request timed out")]
  Timeout,

  #[error("network error: {0}")]
  Network(String),

  #[error("server responded with {0}")]
  Server(u16),

  #[error("malformed response: {0}")]
  Decode(String),
}

impl From<reqwest::Error> for Error {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Error::Timeout
    } else if err.is_decode() {
      Error::Decode(err.to_string())
    } else {
      Error::Network(err.to_string())
    }
  }
}

#[async_trait]
pub trait Validator: Send + Sync {
  async fn validate(&self, key: &str) -> Result<ValidateRes, Error>;
}

pub struct HttpValidator {
  client: reqwest::Client,
  url: String,
}

impl HttpValidator {
  pub fn new(api_url: &str, timeout: Duration) -> Result<Self, Error> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|err| Error::Network(err.to_string()))?;

    Ok(Self {
      client,
      url: format!("{}/validate-license", api_url.trim_end_matches('/')),
    })
  }
}

/// Statuses whose body is an authoritative verdict.
fn is_verdict(status: StatusCode) -> bool {
  matches!(
    status,
    StatusCode::OK
      | StatusCode::NOT_FOUND
      | StatusCode::BAD_REQUEST
      | StatusCode::FORBIDDEN
  )
}

#[async_trait]
impl Validator for HttpValidator {
  async fn validate(&self, key: &str) -> Result<ValidateRes, Error> {
    let res = self
      .client
      .post(&self.url)
      .json(&ValidateReq { license_key: key.to_string() })
      .send()
      .await?;

    let status = res.status();
    if !is_verdict(status) {
      return Err(Error::Server(status.as_u16()));
    }

    // a proxy error page on 404 must not wipe the cache
    let bytes = res.bytes().await?;
    json::from_slice(&bytes).map_err(|err| Error::Decode(err.to_string()))
  }
}
