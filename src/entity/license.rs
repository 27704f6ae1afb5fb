//! License entity - issued license keys and their lifecycle state

use chrono::TimeDelta;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
  Clone,
  Copy,
  Debug,
  Default,
  PartialEq,
  Eq,
  Hash,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Plan {
  #[default]
  #[sea_orm(string_value = "monthly")]
  Monthly,
  #[sea_orm(string_value = "yearly")]
  Yearly,
}

impl Plan {
  pub fn days(self) -> i64 {
    match self {
      Self::Monthly => 30,
      Self::Yearly => 365,
    }
  }

  pub fn duration(self) -> TimeDelta {
    TimeDelta::days(self.days())
  }

  pub fn price_cents(self) -> i32 {
    match self {
      Self::Monthly => 999,
      Self::Yearly => 5999,
    }
  }
}

/// Stored status. Expiry is never written here, it is computed on read.
#[derive(
  Clone,
  Copy,
  Debug,
  Default,
  PartialEq,
  Eq,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Status {
  #[default]
  #[sea_orm(string_value = "active")]
  Active,
  #[sea_orm(string_value = "suspended")]
  Suspended,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "licenses")]
#[serde(rename_all = "camelCase")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  #[sea_orm(unique)]
  pub key: String,
  pub email: String,
  pub plan: Plan,
  pub price_cents: i32,
  pub status: Status,
  #[serde(with = "crate::utils::timestamp")]
  pub created_at: DateTime,
  #[serde(rename = "expiryDate", with = "crate::utils::timestamp")]
  pub expires_at: DateTime,
  /// Payment session that produced this license, if any
  #[sea_orm(unique)]
  pub payment_ref: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
