//! Device-side license cache
//!
//! The device keeps the last successful validation on disk and refreshes it
//! against the server. Only an authoritative `invalid` answer clears it;
//! transport failures leave it as it was.

mod monitor;
mod storage;
mod transport;

use std::{env, path::PathBuf};

use futures::{
  FutureExt,
  future::{BoxFuture, Shared},
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub use monitor::Monitor;
pub use storage::Storage;
pub use transport::{Error, HttpValidator, Validator};

use crate::{
  entity::server,
  model::{Reason, ValidateRes},
  prelude::*,
  sv::keygen,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedLicense {
  pub key: String,
  pub servers: Vec<server::Model>,
  pub remaining_days: i64,
  #[serde(with = "crate::utils::timestamp")]
  pub checked_at: DateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
  /// Server confirmed the license; cache rewritten.
  Licensed { remaining_days: i64 },
  /// Server rejected the license; cache cleared.
  Reset { reason: Reason },
  /// No answer from the server; cache untouched.
  RetryLater,
  /// Nothing stored, nothing to check.
  Unlicensed,
}

#[derive(Debug, Clone)]
pub struct Config {
  pub api_url: String,
  pub cache_path: PathBuf,
  pub refresh_interval: Duration,
  pub request_timeout: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api_url: String::from("http://localhost:3000/api"),
      cache_path: PathBuf::from("vpn_license.json"),
      refresh_interval: Duration::from_secs(5 * 60),
      request_timeout: Duration::from_secs(10),
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let default = Self::default();

    Ok(Self {
      api_url: env::var("VPN_API_URL").unwrap_or(default.api_url),
      cache_path: env::var("VPN_CACHE_PATH")
        .map(PathBuf::from)
        .unwrap_or(default.cache_path),
      refresh_interval: duration("VPN_REFRESH_INTERVAL")?
        .unwrap_or(default.refresh_interval),
      request_timeout: duration("VPN_REQUEST_TIMEOUT")?
        .unwrap_or(default.request_timeout),
    })
  }
}

fn duration(name: &str) -> anyhow::Result<Option<Duration>> {
  match env::var(name) {
    Ok(raw) => humantime::parse_duration(raw.trim())
      .map(Some)
      .with_context(|| format!("Invalid {name}")),
    Err(_) => Ok(None),
  }
}

struct Inner {
  storage: Storage,
  validator: Arc<dyn Validator>,
  // serializes cache writes between refresh and activate
  writes: Mutex<()>,
}

impl Inner {
  async fn refresh(&self) -> Refresh {
    let Some(cached) = self.storage.load().await else {
      return Refresh::Unlicensed;
    };

    let res = match self.validator.validate(&cached.key).await {
      Ok(res) => res,
      Err(err) => {
        debug!("License refresh deferred: {err}");
        return Refresh::RetryLater;
      }
    };

    let _guard = self.writes.lock().await;

    // the key was replaced while we were waiting on the server
    let current = self.storage.load().await.map(|c| c.key);
    if current.as_deref() != Some(cached.key.as_str()) {
      debug!("Dropping stale refresh result for {}", cached.key);
      return Refresh::RetryLater;
    }

    self.apply(cached.key, res).await
  }

  async fn apply(&self, key: String, res: ValidateRes) -> Refresh {
    match res {
      ValidateRes::Valid { remaining_days, servers, .. } => {
        let cached = CachedLicense {
          key,
          servers,
          remaining_days,
          checked_at: utils::now(),
        };
        if let Err(err) = self.storage.save(&cached).await {
          error!("Failed to persist license cache: {err}");
        }
        Refresh::Licensed { remaining_days }
      }
      ValidateRes::Invalid { reason, message } => {
        warn!("License {key} rejected by server: {message}");
        if let Err(err) = self.storage.clear().await {
          error!("Failed to clear license cache: {err}");
        }
        Refresh::Reset { reason }
      }
    }
  }
}

pub struct LicenseCache {
  inner: Arc<Inner>,
  inflight: Mutex<Option<Shared<BoxFuture<'static, Refresh>>>>,
}

impl LicenseCache {
  pub fn new(storage: Storage, validator: Arc<dyn Validator>) -> Self {
    Self {
      inner: Arc::new(Inner { storage, validator, writes: Mutex::new(()) }),
      inflight: Mutex::new(None),
    }
  }

  pub async fn cached(&self) -> Option<CachedLicense> {
    self.inner.storage.load().await
  }

  /// Checks a user-entered key and stores it only if the server accepts it.
  /// A rejected key leaves any previous license in place.
  pub async fn activate(&self, key: &str) -> Refresh {
    let key = keygen::normalize(key);

    match self.inner.validator.validate(&key).await {
      Ok(ValidateRes::Valid { remaining_days, servers, .. }) => {
        let _guard = self.inner.writes.lock().await;
        let cached = CachedLicense {
          key,
          servers,
          remaining_days,
          checked_at: utils::now(),
        };
        if let Err(err) = self.inner.storage.save(&cached).await {
          error!("Failed to persist license cache: {err}");
        }
        info!("Activated license {} ({remaining_days} days)", cached.key);
        Refresh::Licensed { remaining_days }
      }
      Ok(ValidateRes::Invalid { reason, .. }) => Refresh::Reset { reason },
      Err(err) => {
        debug!("Activation deferred: {err}");
        Refresh::RetryLater
      }
    }
  }

  /// Concurrent callers share a single request and observe the same result.
  pub async fn refresh(&self) -> Refresh {
    let task = {
      let mut slot = self.inflight.lock().await;
      match &*slot {
        Some(task) if task.peek().is_none() => task.clone(),
        _ => {
          let inner = self.inner.clone();
          let task = async move { inner.refresh().await }.boxed().shared();
          *slot = Some(task.clone());
          task
        }
      }
    };

    let outcome = task.clone().await;

    let mut slot = self.inflight.lock().await;
    if slot.as_ref().is_some_and(|current| current.ptr_eq(&task)) {
      *slot = None;
    }

    outcome
  }
}


#[cfg(test)]
mod tests {
  use super::{testing::*, *};

  const KEY: &str = "DEMO-1234-5678-9ABC";

  fn cached(days: i64) -> CachedLicense {
    CachedLicense {
      key: KEY.into(),
      servers: vec![],
      remaining_days: days,
      checked_at: "2024-01-01T00:00:00".parse().unwrap(),
    }
  }

  async fn setup(
    stored: Option<CachedLicense>,
    validator: Scripted,
  ) -> (tempfile::TempDir, Arc<Scripted>, LicenseCache) {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(dir.path().join("license.json"));
    if let Some(stored) = stored {
      storage.save(&stored).await.unwrap();
    }

    let validator = Arc::new(validator);
    let cache = LicenseCache::new(storage, validator.clone());
    (dir, validator, cache)
  }

  #[tokio::test]
  async fn test_valid_refresh_overwrites_cache() {
    let (_dir, _, cache) =
      setup(Some(cached(30)), Scripted::new(vec![valid(16)])).await;

    assert_eq!(cache.refresh().await, Refresh::Licensed { remaining_days: 16 });

    let stored = cache.cached().await.unwrap();
    assert_eq!(stored.key, KEY);
    assert_eq!(stored.remaining_days, 16);
    assert!(stored.checked_at > cached(30).checked_at);
  }

  #[tokio::test]
  async fn test_invalid_refresh_clears_cache() {
    for reason in [Reason::NotFound, Reason::Expired, Reason::Suspended] {
      let (_dir, _, cache) =
        setup(Some(cached(3)), Scripted::new(vec![invalid(reason)])).await;

      assert_eq!(cache.refresh().await, Refresh::Reset { reason });
      assert_eq!(cache.cached().await, None);
    }
  }

  #[tokio::test]
  async fn test_transport_failure_keeps_cache() {
    let answers = vec![
      Err(Error::Timeout),
      Err(Error::Server(503)),
      Err(Error::Server(429)),
      Err(Error::Network("connection reset".into())),
      Err(Error::Decode("unexpected <html>".into())),
    ];
    let (_dir, validator, cache) =
      setup(Some(cached(7)), Scripted::new(answers)).await;

    for _ in 0..5 {
      assert_eq!(cache.refresh().await, Refresh::RetryLater);
      assert_eq!(cache.cached().await, Some(cached(7)));
    }
    assert_eq!(validator.calls(), 5);
  }

  #[tokio::test]
  async fn test_refresh_without_key() {
    let (_dir, validator, cache) = setup(None, Scripted::default()).await;

    assert_eq!(cache.refresh().await, Refresh::Unlicensed);
    assert_eq!(validator.calls(), 0);
  }

  #[tokio::test]
  async fn test_concurrent_refreshes_share_one_request() {
    let validator =
      Scripted::new(vec![valid(12)]).delayed(Duration::from_millis(50));
    let (_dir, validator, cache) = setup(Some(cached(30)), validator).await;

    let outcomes =
      futures::future::join_all((0..5).map(|_| cache.refresh())).await;

    assert_eq!(validator.calls(), 1);
    assert!(
      outcomes.iter().all(|o| *o == Refresh::Licensed { remaining_days: 12 })
    );

    // the next call is a fresh request
    assert_eq!(cache.refresh().await, Refresh::RetryLater);
    assert_eq!(validator.calls(), 2);
  }

  #[tokio::test]
  async fn test_activate_stores_only_accepted_keys() {
    let answers = vec![invalid(Reason::NotFound), Err(Error::Timeout), valid(30)];
    let (_dir, _, cache) = setup(None, Scripted::new(answers)).await;

    assert_eq!(
      cache.activate("nope-nope-nope-nope").await,
      Refresh::Reset { reason: Reason::NotFound }
    );
    assert_eq!(cache.cached().await, None);

    assert_eq!(cache.activate(KEY).await, Refresh::RetryLater);
    assert_eq!(cache.cached().await, None);

    assert_eq!(
      cache.activate(" demo-1234-5678-9abc ").await,
      Refresh::Licensed { remaining_days: 30 }
    );
    assert_eq!(cache.cached().await.unwrap().key, KEY);
  }

  #[tokio::test]
  async fn test_rejected_activation_keeps_previous_license() {
    let (_dir, _, cache) =
      setup(Some(cached(9)), Scripted::new(vec![invalid(Reason::Expired)]))
        .await;

    cache.activate("ZZZZ-ZZZZ-ZZZZ-ZZZZ").await;
    assert_eq!(cache.cached().await, Some(cached(9)));
  }

  #[tokio::test]
  async fn test_against_live_server() {
    use crate::{
      config::Config as ServerConfig, entity::license::Plan,
      plugins::server::routes, state::AppState,
    };

    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let app = Arc::new(AppState::with_db(db, ServerConfig::default()));
    app.sv().server.seed_defaults().await.unwrap();
    let license =
      app.sv().license.create("a@example.com", Plan::Monthly, None).await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = routes().with_state(app.clone());
    tokio::spawn(async move { axum::serve(listener, router).await });

    let dir = tempfile::tempdir().unwrap();
    let validator = HttpValidator::new(
      &format!("http://{addr}/api"),
      Duration::from_secs(5),
    )
    .unwrap();
    let cache = LicenseCache::new(
      Storage::new(dir.path().join("license.json")),
      Arc::new(validator),
    );

    assert_eq!(
      cache.activate(&license.key).await,
      Refresh::Licensed { remaining_days: 30 }
    );
    assert_eq!(cache.cached().await.unwrap().servers.len(), 3);

    app.sv().license.suspend(&license.id).await.unwrap();
    assert_eq!(
      cache.refresh().await,
      Refresh::Reset { reason: Reason::Suspended }
    );
    assert_eq!(cache.cached().await, None);
  }
}
