use serde::Serialize;
use uuid::Uuid;

use super::keygen::{self, KeySource};
use crate::{
  entity::{
    license::{self, Plan, Status},
    server,
  },
  prelude::*,
  store::{LicensePatch, LicenseStore, ServerCatalog},
};

/// Attempts at finding an unused key before giving up.
pub const MAX_KEY_ATTEMPTS: u32 = 8;

/// Outcome of checking a key. Never written back to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
  NotFound,
  Expired,
  Suspended,
  Valid { remaining_days: i64, email: String, servers: Vec<server::Model> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Counts {
  pub total: u64,
  pub active: u64,
}

pub struct License<'a> {
  store: &'a dyn LicenseStore,
  keys: &'a dyn KeySource,
  catalog: &'a dyn ServerCatalog,
}

impl<'a> License<'a> {
  pub fn new(
    store: &'a dyn LicenseStore,
    keys: &'a dyn KeySource,
    catalog: &'a dyn ServerCatalog,
  ) -> Self {
    Self { store, keys, catalog }
  }

  pub async fn create(
    &self,
    email: &str,
    plan: Plan,
    expires_at: Option<DateTime>,
  ) -> Result<license::Model> {
    self.create_at(email, plan, expires_at, utils::now()).await
  }

  pub async fn create_at(
    &self,
    email: &str,
    plan: Plan,
    expires_at: Option<DateTime>,
    now: DateTime,
  ) -> Result<license::Model> {
    self.issue(email, plan, expires_at, None, now).await
  }

  async fn issue(
    &self,
    email: &str,
    plan: Plan,
    expires_at: Option<DateTime>,
    payment_ref: Option<&str>,
    now: DateTime,
  ) -> Result<license::Model> {
    let email = email.trim();
    if email.is_empty() {
      return Err(Error::InvalidArgs("email is required".into()));
    }

    for attempt in 1..=MAX_KEY_ATTEMPTS {
      let license = license::Model {
        id: Uuid::new_v4().to_string(),
        key: self.keys.next_key(),
        email: email.to_string(),
        plan,
        price_cents: plan.price_cents(),
        status: Status::Active,
        created_at: now,
        expires_at: expires_at.unwrap_or(now + plan.duration()),
        payment_ref: payment_ref.map(str::to_string),
      };

      match self.store.insert(license).await {
        Ok(license) => {
          info!(
            "Issued {:?} license {} to {} (expires {})",
            license.plan,
            license.key,
            license.email,
            utils::format_date(license.expires_at)
          );
          return Ok(license);
        }
        Err(Error::DuplicateKey) => {
          warn!("License key collision on attempt {attempt}, regenerating");
        }
        Err(err) => return Err(err),
      }
    }

    error!("Gave up issuing a license after {MAX_KEY_ATTEMPTS} key collisions");
    Err(Error::KeySpaceExhausted(MAX_KEY_ATTEMPTS))
  }

  pub async fn validate(&self, key: &str) -> Result<Validation> {
    self.validate_at(key, utils::now()).await
  }

  /// Expiry is checked before suspension, so an expired suspended license
  /// reports `Expired`.
  pub async fn validate_at(
    &self,
    key: &str,
    now: DateTime,
  ) -> Result<Validation> {
    let key = keygen::normalize(key);
    if !keygen::is_well_formed(&key) {
      return Ok(Validation::NotFound);
    }

    let license = match self.store.find_by_key(&key).await {
      Ok(license) => license,
      Err(Error::LicenseNotFound) => return Ok(Validation::NotFound),
      Err(err) => return Err(err),
    };

    let remaining_days = utils::remaining_days(license.expires_at, now);
    if remaining_days <= 0 {
      return Ok(Validation::Expired);
    }

    if license.status == Status::Suspended {
      return Ok(Validation::Suspended);
    }

    Ok(Validation::Valid {
      remaining_days,
      email: license.email,
      servers: self.catalog.servers().await?,
    })
  }

  pub async fn by_id(&self, id: &str) -> Result<license::Model> {
    self.store.find_by_id(id).await
  }

  pub async fn all(&self) -> Result<Vec<license::Model>> {
    self.store.list().await
  }

  pub async fn update(
    &self,
    id: &str,
    patch: LicensePatch,
  ) -> Result<license::Model> {
    if patch.email.as_deref().is_some_and(|email| email.trim().is_empty()) {
      return Err(Error::InvalidArgs("email must not be empty".into()));
    }
    self.store.update(id, patch).await
  }

  pub async fn suspend(&self, id: &str) -> Result<license::Model> {
    let license =
      self.store.update(id, LicensePatch::status(Status::Suspended)).await?;
    info!("Suspended license {}", license.key);
    Ok(license)
  }

  pub async fn reactivate(&self, id: &str) -> Result<license::Model> {
    let license =
      self.store.update(id, LicensePatch::status(Status::Active)).await?;
    info!("Reactivated license {}", license.key);
    Ok(license)
  }

  pub async fn delete(&self, id: &str) -> Result<()> {
    self.store.delete(id).await?;
    info!("Deleted license {id}");
    Ok(())
  }

  /// Issues a monthly license for a completed payment. Redelivery of the
  /// same `reference` returns the license issued the first time.
  pub async fn on_payment_completed(
    &self,
    reference: &str,
    email: &str,
  ) -> Result<license::Model> {
    self.on_payment_completed_at(reference, email, utils::now()).await
  }

  pub async fn on_payment_completed_at(
    &self,
    reference: &str,
    email: &str,
    now: DateTime,
  ) -> Result<license::Model> {
    if let Some(existing) = self.store.find_by_payment(reference).await? {
      info!("Payment {reference} already redeemed by {}", existing.key);
      return Ok(existing);
    }

    match self.issue(email, Plan::Monthly, None, Some(reference), now).await {
      // lost a race against a concurrent delivery of the same event
      Err(Error::DuplicatePayment) => self
        .store
        .find_by_payment(reference)
        .await?
        .ok_or(Error::LicenseNotFound),
      result => result,
    }
  }

  pub async fn counts(&self) -> Result<Counts> {
    let now = utils::now();
    let licenses = self.store.list().await?;

    let active = licenses
      .iter()
      .filter(|l| l.status == Status::Active && l.expires_at > now)
      .count();

    Ok(Counts { total: licenses.len() as u64, active: active as u64 })
  }
}
