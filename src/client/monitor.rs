use tokio::{
  sync::{Notify, watch},
  time::MissedTickBehavior,
};

use super::{LicenseCache, Refresh};
use crate::prelude::*;

/// Refreshes the cache on a timer and whenever the app regains focus.
pub struct Monitor {
  cache: Arc<LicenseCache>,
  interval: Duration,
  focus: Notify,
  outcome: watch::Sender<Option<Refresh>>,
}

impl Monitor {
  pub fn new(cache: Arc<LicenseCache>, interval: Duration) -> Self {
    let (outcome, _) = watch::channel(None);
    Self { cache, interval, focus: Notify::new(), outcome }
  }

  /// Latest refresh outcome, `None` until the first check finishes.
  pub fn subscribe(&self) -> watch::Receiver<Option<Refresh>> {
    self.outcome.subscribe()
  }

  pub fn focus(&self) {
    self.focus.notify_one();
  }

  /// Runs until the future is dropped. The first check happens immediately.
  pub async fn run(&self) {
    let mut ticker = time::interval(self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        _ = ticker.tick() => debug!("Periodic license check"),
        _ = self.focus.notified() => debug!("License check on focus"),
      }

      let outcome = self.cache.refresh().await;
      match &outcome {
        Refresh::Reset { reason } => {
          warn!("License no longer valid ({reason:?}), cache cleared");
        }
        Refresh::Licensed { remaining_days } => {
          debug!("License valid for {remaining_days} more days");
        }
        Refresh::RetryLater | Refresh::Unlicensed => {}
      }

      self.outcome.send_replace(Some(outcome));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::client::{
    CachedLicense, Storage,
    testing::{Scripted, valid},
  };

  async fn next(
    rx: &mut watch::Receiver<Option<Refresh>>,
  ) -> Option<Refresh> {
    time::timeout(Duration::from_secs(5), rx.changed())
      .await
      .expect("monitor produced no outcome")
      .unwrap();
    rx.borrow_and_update().clone()
  }

  #[tokio::test]
  async fn test_checks_on_start_and_focus() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(dir.path().join("license.json"));
    storage
      .save(&CachedLicense {
        key: "DEMO-1234-5678-9ABC".into(),
        servers: vec![],
        remaining_days: 30,
        checked_at: "2024-01-01T00:00:00".parse().unwrap(),
      })
      .await
      .unwrap();

    let validator = Arc::new(Scripted::new(vec![valid(20), valid(19)]));
    let cache = Arc::new(LicenseCache::new(storage, validator.clone()));
    let monitor = Arc::new(Monitor::new(cache, Duration::from_secs(3600)));
    let mut rx = monitor.subscribe();

    let runner = tokio::spawn({
      let monitor = monitor.clone();
      async move { monitor.run().await }
    });

    assert_eq!(
      next(&mut rx).await,
      Some(Refresh::Licensed { remaining_days: 20 })
    );

    monitor.focus();
    assert_eq!(
      next(&mut rx).await,
      Some(Refresh::Licensed { remaining_days: 19 })
    );
    assert_eq!(validator.calls(), 2);

    runner.abort();
  }

  #[tokio::test]
  async fn test_ticks_periodically() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(LicenseCache::new(
      Storage::new(dir.path().join("license.json")),
      Arc::new(Scripted::default()),
    ));
    let monitor = Arc::new(Monitor::new(cache, Duration::from_millis(20)));
    let mut rx = monitor.subscribe();

    let runner = tokio::spawn({
      let monitor = monitor.clone();
      async move { monitor.run().await }
    });

    for _ in 0..3 {
      assert_eq!(next(&mut rx).await, Some(Refresh::Unlicensed));
    }

    runner.abort();
  }
}
