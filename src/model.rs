//! JSON bodies shared by the server routes and the device client

use serde::{Deserialize, Serialize};

use crate::entity::server;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReq {
  pub license_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
  NotFound,
  Expired,
  Suspended,
}

impl Reason {
  pub fn message(self) -> &'static str {
    match self {
      Reason::NotFound => "License key not found",
      Reason::Expired => "License has expired",
      Reason::Suspended => "License has been suspended",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidateRes {
  #[serde(rename_all = "camelCase")]
  Valid {
    /// Owner email
    user: String,
    remaining_days: i64,
    servers: Vec<server::Model>,
  },
  Invalid { reason: Reason, message: String },
}

impl ValidateRes {
  pub fn invalid(reason: Reason) -> Self {
    Self::Invalid { reason, message: reason.message().to_string() }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginReq {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRes {
  pub success: bool,
  pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyReq {
  pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Received {
  pub received: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Deleted {
  pub success: bool,
  pub message: &'static str,
}

impl Deleted {
  pub fn new(message: &'static str) -> Self {
    Self { success: true, message }
  }
}
