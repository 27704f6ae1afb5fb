use serde::Deserialize;
use uuid::Uuid;

use crate::{
  entity::user::{self, Status},
  prelude::*,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
  pub email: String,
  pub license_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
  pub email: Option<String>,
  pub license_key: Option<String>,
  pub status: Option<Status>,
  pub total_usage: Option<i64>,
  pub current_server: Option<String>,
  #[serde(default, with = "crate::utils::timestamp::option")]
  pub last_login: Option<DateTime>,
}

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Newest first.
  pub async fn all(&self) -> Result<Vec<user::Model>> {
    let users = user::Entity::find()
      .order_by_desc(user::Column::CreatedAt)
      .all(self.db)
      .await?;
    Ok(users)
  }

  pub async fn by_id(&self, id: &str) -> Result<user::Model> {
    user::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::UserNotFound)
  }

  pub async fn by_license(&self, key: &str) -> Result<Vec<user::Model>> {
    let users = user::Entity::find()
      .filter(user::Column::LicenseKey.eq(key))
      .all(self.db)
      .await?;
    Ok(users)
  }

  pub async fn create(&self, new: NewUser) -> Result<user::Model> {
    let email = new.email.trim();
    if email.is_empty() {
      return Err(Error::InvalidArgs("email is required".into()));
    }

    let now = utils::now();
    let user = user::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      email: Set(email.to_string()),
      license_key: Set(new.license_key),
      last_login: Set(Some(now)),
      total_usage: Set(0),
      status: Set(Status::Active),
      current_server: Set(None),
      created_at: Set(now),
    }
    .insert(self.db)
    .await?;

    info!("Registered user {}", user.email);
    Ok(user)
  }

  pub async fn update(&self, id: &str, patch: UserPatch) -> Result<user::Model> {
    if patch.email.as_deref().is_some_and(|email| email.trim().is_empty()) {
      return Err(Error::InvalidArgs("email must not be empty".into()));
    }

    let mut user = self.by_id(id).await?.into_active_model();

    if let Some(email) = patch.email {
      user.email = Set(email);
    }
    if let Some(key) = patch.license_key {
      user.license_key = Set(Some(key));
    }
    if let Some(status) = patch.status {
      user.status = Set(status);
    }
    if let Some(total_usage) = patch.total_usage {
      user.total_usage = Set(total_usage);
    }
    if let Some(server) = patch.current_server {
      user.current_server = Set(Some(server));
    }
    if let Some(last_login) = patch.last_login {
      user.last_login = Set(Some(last_login));
    }

    if !user.is_changed() {
      return self.by_id(id).await;
    }

    Ok(user.update(self.db).await?)
  }

  pub async fn delete(&self, id: &str) -> Result<()> {
    let result = user::Entity::delete_by_id(id).exec(self.db).await?;
    if result.rows_affected == 0 {
      return Err(Error::UserNotFound);
    }

    info!("Deleted user {id}");
    Ok(())
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(user::Entity::find().count(self.db).await?)
  }
}
