use dashmap::mapref::entry::Entry;

use super::{LicensePatch, LicenseStore};
use crate::{entity::license, prelude::*};

/// In-process store. The `keys` index is the serialization point for
/// inserts and keeps entries of deleted licenses so their keys stay taken.
#[derive(Debug, Default)]
pub struct Mem {
  licenses: DashMap<String, license::Model>,
  keys: DashMap<String, String>,
  payments: DashMap<String, String>,
}

impl Mem {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.licenses.len()
  }

  pub fn is_empty(&self) -> bool {
    self.licenses.is_empty()
  }
}

#[async_trait]
impl LicenseStore for Mem {
  async fn insert(&self, license: license::Model) -> Result<license::Model> {
    let Entry::Vacant(key_slot) = self.keys.entry(license.key.clone()) else {
      return Err(Error::DuplicateKey);
    };

    let payment_slot = match &license.payment_ref {
      Some(reference) => match self.payments.entry(reference.clone()) {
        Entry::Occupied(_) => return Err(Error::DuplicatePayment),
        Entry::Vacant(slot) => Some(slot),
      },
      None => None,
    };

    // the row must exist before any index points at it
    self.licenses.insert(license.id.clone(), license.clone());
    if let Some(slot) = payment_slot {
      slot.insert(license.id.clone());
    }
    key_slot.insert(license.id.clone());

    Ok(license)
  }

  async fn find_by_key(&self, key: &str) -> Result<license::Model> {
    let id =
      self.keys.get(key).ok_or(Error::LicenseNotFound)?.value().clone();
    self.find_by_id(&id).await
  }

  async fn find_by_id(&self, id: &str) -> Result<license::Model> {
    self
      .licenses
      .get(id)
      .map(|license| license.value().clone())
      .ok_or(Error::LicenseNotFound)
  }

  async fn find_by_payment(
    &self,
    reference: &str,
  ) -> Result<Option<license::Model>> {
    let Some(id) = self.payments.get(reference).map(|id| id.value().clone())
    else {
      return Ok(None);
    };
    Ok(self.licenses.get(&id).map(|license| license.value().clone()))
  }

  async fn list(&self) -> Result<Vec<license::Model>> {
    let mut licenses: Vec<_> =
      self.licenses.iter().map(|entry| entry.value().clone()).collect();
    licenses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(licenses)
  }

  async fn update(
    &self,
    id: &str,
    patch: LicensePatch,
  ) -> Result<license::Model> {
    let mut license =
      self.licenses.get_mut(id).ok_or(Error::LicenseNotFound)?;
    patch.merge(&mut license);
    Ok(license.value().clone())
  }

  async fn delete(&self, id: &str) -> Result<()> {
    let (_, license) =
      self.licenses.remove(id).ok_or(Error::LicenseNotFound)?;

    if let Some(reference) = &license.payment_ref {
      self.payments.remove(reference);
    }

    Ok(())
  }
}
