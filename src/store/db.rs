use sea_orm::{DbErr, SqlErr, TransactionTrait};

use super::{LicensePatch, LicenseStore};
use crate::{
  entity::{license, retired_key},
  prelude::*,
};

/// SQLite-backed store. Key uniqueness rests on the `idx_licenses_key`
/// unique index, so concurrent inserts of one key cannot both commit.
#[derive(Debug, Clone)]
pub struct Db {
  db: DatabaseConnection,
}

impl Db {
  pub fn new(db: DatabaseConnection) -> Self {
    Self { db }
  }
}

fn classify(err: DbErr) -> Error {
  match err.sql_err() {
    Some(SqlErr::UniqueConstraintViolation(detail))
      if detail.contains("payment_ref") =>
    {
      Error::DuplicatePayment
    }
    Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateKey,
    _ => Error::Database(err),
  }
}

#[async_trait]
impl LicenseStore for Db {
  async fn insert(&self, license: license::Model) -> Result<license::Model> {
    let txn = self.db.begin().await?;

    if retired_key::Entity::find_by_id(license.key.as_str())
      .one(&txn)
      .await?
      .is_some()
    {
      return Err(Error::DuplicateKey);
    }

    let model = license::ActiveModel {
      id: Set(license.id),
      key: Set(license.key),
      email: Set(license.email),
      plan: Set(license.plan),
      price_cents: Set(license.price_cents),
      status: Set(license.status),
      created_at: Set(license.created_at),
      expires_at: Set(license.expires_at),
      payment_ref: Set(license.payment_ref),
    };

    let license = model.insert(&txn).await.map_err(classify)?;
    txn.commit().await?;

    Ok(license)
  }

  async fn find_by_key(&self, key: &str) -> Result<license::Model> {
    license::Entity::find()
      .filter(license::Column::Key.eq(key))
      .one(&self.db)
      .await?
      .ok_or(Error::LicenseNotFound)
  }

  async fn find_by_id(&self, id: &str) -> Result<license::Model> {
    license::Entity::find_by_id(id)
      .one(&self.db)
      .await?
      .ok_or(Error::LicenseNotFound)
  }

  async fn find_by_payment(
    &self,
    reference: &str,
  ) -> Result<Option<license::Model>> {
    let license = license::Entity::find()
      .filter(license::Column::PaymentRef.eq(reference))
      .one(&self.db)
      .await?;
    Ok(license)
  }

  async fn list(&self) -> Result<Vec<license::Model>> {
    let licenses = license::Entity::find()
      .order_by_desc(license::Column::CreatedAt)
      .all(&self.db)
      .await?;
    Ok(licenses)
  }

  async fn update(
    &self,
    id: &str,
    patch: LicensePatch,
  ) -> Result<license::Model> {
    let txn = self.db.begin().await?;

    let license = license::Entity::find_by_id(id)
      .one(&txn)
      .await?
      .ok_or(Error::LicenseNotFound)?;

    if patch.is_empty() {
      return Ok(license);
    }

    let mut model: license::ActiveModel = license.into();
    patch.apply(&mut model);
    let license = model.update(&txn).await?;

    txn.commit().await?;
    Ok(license)
  }

  async fn delete(&self, id: &str) -> Result<()> {
    let txn = self.db.begin().await?;

    let license = license::Entity::find_by_id(id)
      .one(&txn)
      .await?
      .ok_or(Error::LicenseNotFound)?;

    retired_key::ActiveModel {
      key: Set(license.key.clone()),
      retired_at: Set(utils::now()),
    }
    .insert(&txn)
    .await?;

    license::Entity::delete_by_id(license.id).exec(&txn).await?;

    txn.commit().await?;
    Ok(())
  }
}
