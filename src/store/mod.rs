//! License persistence
//!
//! The lifecycle engine only talks to [`LicenseStore`]; which backend sits
//! behind it is decided when the application state is built.

mod db;
mod mem;

pub use db::Db;
pub use mem::Mem;
use serde::Deserialize;

use crate::{
  entity::{license, server},
  prelude::*,
};

/// Admin-editable license fields. `id` and `key` are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicensePatch {
  pub email: Option<String>,
  pub status: Option<license::Status>,
  #[serde(
    rename = "expiryDate",
    default,
    with = "crate::utils::timestamp::option"
  )]
  pub expires_at: Option<DateTime>,
}

impl LicensePatch {
  pub fn status(status: license::Status) -> Self {
    Self { status: Some(status), ..Default::default() }
  }

  pub fn is_empty(&self) -> bool {
    self.email.is_none() && self.status.is_none() && self.expires_at.is_none()
  }

  pub fn apply(self, model: &mut license::ActiveModel) {
    if let Some(email) = self.email {
      model.email = Set(email);
    }
    if let Some(status) = self.status {
      model.status = Set(status);
    }
    if let Some(expires_at) = self.expires_at {
      model.expires_at = Set(expires_at);
    }
  }

  pub fn merge(self, license: &mut license::Model) {
    if let Some(email) = self.email {
      license.email = email;
    }
    if let Some(status) = self.status {
      license.status = status;
    }
    if let Some(expires_at) = self.expires_at {
      license.expires_at = expires_at;
    }
  }
}

#[async_trait]
pub trait LicenseStore: Send + Sync {
  /// Fails with [`Error::DuplicateKey`] if the key was ever issued by this
  /// store, or [`Error::DuplicatePayment`] if the payment reference is taken.
  async fn insert(&self, license: license::Model) -> Result<license::Model>;

  async fn find_by_key(&self, key: &str) -> Result<license::Model>;

  async fn find_by_id(&self, id: &str) -> Result<license::Model>;

  async fn find_by_payment(
    &self,
    reference: &str,
  ) -> Result<Option<license::Model>>;

  /// Newest first.
  async fn list(&self) -> Result<Vec<license::Model>>;

  async fn update(
    &self,
    id: &str,
    patch: LicensePatch,
  ) -> Result<license::Model>;

  async fn delete(&self, id: &str) -> Result<()>;
}

/// Source of the server list attached to successful validations.
#[async_trait]
pub trait ServerCatalog: Send + Sync {
  async fn servers(&self) -> Result<Vec<server::Model>>;
}

#[async_trait]
impl ServerCatalog for DatabaseConnection {
  async fn servers(&self) -> Result<Vec<server::Model>> {
    let servers = server::Entity::find()
      .order_by_asc(server::Column::CreatedAt)
      .all(self)
      .await?;
    Ok(servers)
  }
}

#[async_trait]
impl ServerCatalog for Vec<server::Model> {
  async fn servers(&self) -> Result<Vec<server::Model>> {
    Ok(self.clone())
  }
}
