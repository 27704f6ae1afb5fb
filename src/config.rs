//! Environment-driven configuration for the license server

use std::env;

use crate::prelude::*;

/// Admin session lifetime in seconds.
pub const ADMIN_TOKEN_TTL_SECS: i64 = 2 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
  pub port: u16,
  pub database_url: String,
  /// Signing secret for admin session tokens
  pub secret: String,
  pub admin_username: String,
  pub admin_password: String,
  /// Payment provider signing secret; the webhook is disabled without it
  pub webhook_secret: Option<String>,
  pub token_ttl: TimeDelta,
  pub rate_per_second: u64,
  pub rate_burst: u32,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      port: 3000,
      database_url: String::from("sqlite:licenses.db?mode=rwc"),
      secret: String::new(),
      admin_username: String::from("admin"),
      admin_password: String::new(),
      webhook_secret: None,
      token_ttl: TimeDelta::seconds(ADMIN_TOKEN_TTL_SECS),
      rate_per_second: 2,
      rate_burst: 100,
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let default = Self::default();

    let secret = env::var("SERVER_SECRET").context("SERVER_SECRET not set")?;
    let admin_password =
      env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD not set")?;

    Ok(Self {
      port: parsed("PORT")?.unwrap_or(default.port),
      database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),
      secret,
      admin_username: env::var("ADMIN_USERNAME")
        .unwrap_or(default.admin_username),
      admin_password,
      webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
        .ok()
        .filter(|s| !s.trim().is_empty()),
      token_ttl: default.token_ttl,
      rate_per_second: parsed("RATE_PER_SECOND")?
        .unwrap_or(default.rate_per_second),
      rate_burst: parsed("RATE_BURST")?.unwrap_or(default.rate_burst),
    })
  }
}

fn parsed<T>(name: &str) -> anyhow::Result<Option<T>>
where
  T: std::str::FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  match env::var(name) {
    Ok(raw) => {
      let value = raw.trim().parse().with_context(|| format!("Invalid {name}"))?;
      Ok(Some(value))
    }
    Err(_) => Ok(None),
  }
}
