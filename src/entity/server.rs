//! VPN server catalog entry

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

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
pub enum Speed {
  #[sea_orm(string_value = "high")]
  High,
  #[default]
  #[sea_orm(string_value = "medium")]
  Medium,
  #[sea_orm(string_value = "low")]
  Low,
}

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
  #[sea_orm(string_value = "online")]
  Online,
  #[sea_orm(string_value = "offline")]
  Offline,
  #[sea_orm(string_value = "maintenance")]
  Maintenance,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "servers")]
#[serde(rename_all = "camelCase")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub name: String,
  pub country: String,
  pub city: String,
  pub host: String,
  pub port: i32,
  pub status: Status,
  pub speed: Speed,
  pub users: i32,
  pub max_users: i32,
  pub bandwidth: i64,
  pub is_active: bool,
  /// Client connection URI (e.g. an Outline `ss://` key)
  pub access_key: Option<String>,
  #[serde(with = "crate::utils::timestamp")]
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
