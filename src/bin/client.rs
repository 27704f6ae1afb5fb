//! Headless license monitor. Each line on stdin counts as the app regaining
//! focus; a line holding a license key activates that key first.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};
use vpn_license::{
  client::{Config, HttpValidator, LicenseCache, Monitor, Refresh, Storage},
  prelude::*,
  sv::keygen,
  utils,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "vpn_license=debug,vpn_client=debug".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env()?;
  info!(
    "Checking licenses against {} every {}",
    config.api_url,
    humantime::format_duration(config.refresh_interval)
  );

  let validator = HttpValidator::new(&config.api_url, config.request_timeout)
    .context("Failed to build HTTP client")?;
  let storage = Storage::new(&config.cache_path);
  debug!("License cache file: {}", storage.path().display());
  let cache = Arc::new(LicenseCache::new(storage, Arc::new(validator)));

  if let Some(cached) = cache.cached().await {
    info!(
      "Cached license {} ({} days at {})",
      cached.key,
      cached.remaining_days,
      utils::format_date(cached.checked_at)
    );
  }

  let monitor = Arc::new(Monitor::new(cache.clone(), config.refresh_interval));
  let mut outcomes = monitor.subscribe();

  tokio::spawn({
    let monitor = monitor.clone();
    async move { monitor.run().await }
  });

  tokio::spawn(async move {
    while outcomes.changed().await.is_ok() {
      let outcome = outcomes.borrow_and_update().clone();
      match outcome {
        Some(Refresh::Licensed { remaining_days }) => {
          info!("Licensed, {remaining_days} days remaining");
        }
        Some(Refresh::Reset { reason }) => {
          warn!("License revoked ({reason:?}), enter a new key");
        }
        Some(Refresh::Unlicensed) => info!("No license, enter a key"),
        Some(Refresh::RetryLater) | None => {}
      }
    }
  });

  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  loop {
    tokio::select! {
      line = lines.next_line() => {
        let Some(line) = line.context("Failed to read stdin")? else {
          break;
        };

        let key = keygen::normalize(&line);
        if keygen::is_well_formed(&key) {
          match cache.activate(&key).await {
            Refresh::Licensed { remaining_days } => {
              info!("Activated {key}, {remaining_days} days remaining");
            }
            Refresh::Reset { reason } => warn!("Key {key} refused: {reason:?}"),
            _ => warn!("Server unreachable, try again later"),
          }
        } else {
          monitor.focus();
        }
      }
      _ = tokio::signal::ctrl_c() => break,
    }
  }

  info!("Bye");
  Ok(())
}
