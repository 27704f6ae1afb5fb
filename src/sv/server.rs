use serde::Deserialize;
use uuid::Uuid;

use crate::{
  entity::server::{self, Speed, Status},
  prelude::*,
};

const GIB: i64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewServer {
  pub name: String,
  pub country: String,
  pub city: String,
  #[serde(alias = "ip")]
  pub host: String,
  pub port: i32,
  #[serde(default)]
  pub speed: Speed,
  pub max_users: Option<i32>,
  pub access_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPatch {
  pub name: Option<String>,
  pub country: Option<String>,
  pub city: Option<String>,
  #[serde(alias = "ip")]
  pub host: Option<String>,
  pub port: Option<i32>,
  pub status: Option<Status>,
  pub speed: Option<Speed>,
  pub users: Option<i32>,
  pub max_users: Option<i32>,
  pub bandwidth: Option<i64>,
  pub is_active: Option<bool>,
  pub access_key: Option<String>,
}

fn check_port(port: i32) -> Result<()> {
  if (1..=65535).contains(&port) {
    Ok(())
  } else {
    Err(Error::InvalidArgs(format!("port {port} is out of range")))
  }
}

pub struct Server<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Server<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn all(&self) -> Result<Vec<server::Model>> {
    let servers = server::Entity::find()
      .order_by_asc(server::Column::CreatedAt)
      .all(self.db)
      .await?;
    Ok(servers)
  }

  pub async fn by_id(&self, id: &str) -> Result<server::Model> {
    server::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::ServerNotFound)
  }

  pub async fn create(&self, new: NewServer) -> Result<server::Model> {
    if new.name.trim().is_empty() || new.host.trim().is_empty() {
      return Err(Error::InvalidArgs("name and host are required".into()));
    }
    check_port(new.port)?;

    let server = server::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      name: Set(new.name),
      country: Set(new.country),
      city: Set(new.city),
      host: Set(new.host),
      port: Set(new.port),
      status: Set(Status::Online),
      speed: Set(new.speed),
      users: Set(0),
      max_users: Set(new.max_users.unwrap_or(100)),
      bandwidth: Set(0),
      is_active: Set(true),
      access_key: Set(new.access_key),
      created_at: Set(utils::now()),
    }
    .insert(self.db)
    .await?;

    info!("Added server {} ({})", server.name, server.host);
    Ok(server)
  }

  pub async fn update(
    &self,
    id: &str,
    patch: ServerPatch,
  ) -> Result<server::Model> {
    if let Some(port) = patch.port {
      check_port(port)?;
    }

    let mut server = self.by_id(id).await?.into_active_model();

    if let Some(name) = patch.name {
      server.name = Set(name);
    }
    if let Some(country) = patch.country {
      server.country = Set(country);
    }
    if let Some(city) = patch.city {
      server.city = Set(city);
    }
    if let Some(host) = patch.host {
      server.host = Set(host);
    }
    if let Some(port) = patch.port {
      server.port = Set(port);
    }
    if let Some(status) = patch.status {
      server.status = Set(status);
    }
    if let Some(speed) = patch.speed {
      server.speed = Set(speed);
    }
    if let Some(users) = patch.users {
      server.users = Set(users);
    }
    if let Some(max_users) = patch.max_users {
      server.max_users = Set(max_users);
    }
    if let Some(bandwidth) = patch.bandwidth {
      server.bandwidth = Set(bandwidth);
    }
    if let Some(is_active) = patch.is_active {
      server.is_active = Set(is_active);
    }
    if let Some(access_key) = patch.access_key {
      server.access_key = Set(Some(access_key));
    }

    if !server.is_changed() {
      return self.by_id(id).await;
    }

    Ok(server.update(self.db).await?)
  }

  pub async fn delete(&self, id: &str) -> Result<()> {
    let result = server::Entity::delete_by_id(id).exec(self.db).await?;
    if result.rows_affected == 0 {
      return Err(Error::ServerNotFound);
    }

    info!("Removed server {id}");
    Ok(())
  }

  /// Fills an empty catalog with the demo endpoints. Returns how many were
  /// inserted.
  pub async fn seed_defaults(&self) -> Result<u64> {
    if server::Entity::find().count(self.db).await? > 0 {
      return Ok(0);
    }

    let now = utils::now();
    let demo = [
      ("US East", "United States", "New York", "us-east", Speed::High, 15),
      ("Frankfurt", "Germany", "Frankfurt", "de-frankfurt", Speed::High, 8),
      ("Tokyo", "Japan", "Tokyo", "jp-tokyo", Speed::Medium, 12),
    ];

    for (n, (name, country, city, host, speed, users)) in
      demo.into_iter().enumerate()
    {
      let host = format!("{host}.example.com");
      let access_key = format!(
        "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ@{host}:8388/?outline=1"
      );

      server::ActiveModel {
        id: Set((n + 1).to_string()),
        name: Set(name.into()),
        country: Set(country.into()),
        city: Set(city.into()),
        host: Set(host),
        port: Set(8388),
        status: Set(Status::Online),
        speed: Set(speed),
        users: Set(users),
        max_users: Set(100),
        bandwidth: Set(GIB),
        is_active: Set(true),
        access_key: Set(Some(access_key)),
        // keeps catalog order stable
        created_at: Set(now + TimeDelta::seconds(n as i64)),
      }
      .insert(self.db)
      .await?;
    }

    info!("Seeded {} demo servers", demo.len());
    Ok(demo.len() as u64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::ServerCatalog;

  async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
  }

  fn new_server(name: &str) -> NewServer {
    NewServer {
      name: name.into(),
      country: "Netherlands".into(),
      city: "Amsterdam".into(),
      host: "nl-ams.example.com".into(),
      port: 8388,
      speed: Speed::Medium,
      max_users: None,
      access_key: None,
    }
  }

  #[tokio::test]
  async fn test_seed_defaults_once() {
    let db = setup_test_db().await;
    let sv = Server::new(&db);

    assert_eq!(sv.seed_defaults().await.unwrap(), 3);
    assert_eq!(sv.seed_defaults().await.unwrap(), 0);

    let names: Vec<_> =
      sv.all().await.unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(names, ["US East", "Frankfurt", "Tokyo"]);

    let tokyo = sv.by_id("3").await.unwrap();
    assert_eq!(tokyo.speed, Speed::Medium);
    assert_eq!(tokyo.host, "jp-tokyo.example.com");
    assert!(tokyo.access_key.unwrap().contains("@jp-tokyo.example.com:8388"));
  }

  #[tokio::test]
  async fn test_crud() {
    let db = setup_test_db().await;
    let sv = Server::new(&db);

    let created = sv.create(new_server("Amsterdam")).await.unwrap();
    assert_eq!(created.status, Status::Online);
    assert_eq!(created.max_users, 100);
    assert_eq!(created.users, 0);

    let patch = ServerPatch {
      status: Some(Status::Maintenance),
      users: Some(42),
      ..Default::default()
    };
    let updated = sv.update(&created.id, patch).await.unwrap();
    assert_eq!(updated.status, Status::Maintenance);
    assert_eq!(updated.users, 42);
    assert_eq!(updated.name, "Amsterdam");
    assert_eq!(updated.created_at, created.created_at);

    sv.delete(&created.id).await.unwrap();
    assert!(matches!(sv.by_id(&created.id).await, Err(Error::ServerNotFound)));
    assert!(matches!(sv.delete(&created.id).await, Err(Error::ServerNotFound)));
  }

  #[tokio::test]
  async fn test_rejects_bad_input() {
    let db = setup_test_db().await;
    let sv = Server::new(&db);

    let mut bad = new_server("Nowhere");
    bad.port = 0;
    assert!(matches!(sv.create(bad).await, Err(Error::InvalidArgs(_))));
    assert!(matches!(
      sv.create(new_server("  ")).await,
      Err(Error::InvalidArgs(_))
    ));

    assert!(matches!(
      sv.update("missing", ServerPatch::default()).await,
      Err(Error::ServerNotFound)
    ));
  }

  #[tokio::test]
  async fn test_catalog_matches_listing() {
    let db = setup_test_db().await;
    let sv = Server::new(&db);
    sv.seed_defaults().await.unwrap();
    sv.create(new_server("Amsterdam")).await.unwrap();

    assert_eq!(db.servers().await.unwrap(), sv.all().await.unwrap());
  }

  #[test]
  fn test_new_server_accepts_ip_alias() {
    let req: NewServer = json::from_str(
      r#"{"name":"X","country":"Y","city":"Z","ip":"1.2.3.4","port":443}"#,
    )
    .unwrap();

    assert_eq!(req.host, "1.2.3.4");
    assert_eq!(req.speed, Speed::Medium);
  }
}
