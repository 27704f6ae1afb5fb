use migration::Migrator;

use crate::{
  config::Config,
  payment::Stripe,
  prelude::*,
  store::{Db, LicenseStore},
  sv::{
    self,
    keygen::{KeySource, RandomKeys},
  },
};

pub struct Services<'a> {
  pub license: sv::License<'a>,
  pub server: sv::Server<'a>,
  pub user: sv::User<'a>,
  pub admin: &'a sv::Authority,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub store: Arc<dyn LicenseStore>,
  pub keys: Arc<dyn KeySource>,
  pub admin: sv::Authority,
  /// `None` disables the payment webhook
  pub stripe: Option<Stripe>,
  pub config: Config,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
      .await
      .context("Failed to connect to database")?;

    info!("Running migrations...");
    Migrator::up(&db, None).await.context("Failed to run migrations")?;

    let app = Self::with_db(db, config);

    let seeded = app.sv().server.seed_defaults().await?;
    if seeded == 0 {
      debug!("Server catalog already populated");
    }

    Ok(app)
  }

  /// Builds the state around an already migrated connection.
  pub fn with_db(db: DatabaseConnection, config: Config) -> Self {
    let admin = sv::Authority::new(
      config.admin_username.clone(),
      config.admin_password.clone(),
      &config.secret,
      config.token_ttl,
    );

    if config.webhook_secret.is_none() {
      warn!("STRIPE_WEBHOOK_SECRET not set, payment webhook is disabled");
    }

    Self {
      store: Arc::new(Db::new(db.clone())),
      keys: Arc::new(RandomKeys),
      stripe: config.webhook_secret.as_deref().map(Stripe::new),
      admin,
      db,
      config,
    }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      license: sv::License::new(&*self.store, &*self.keys, &self.db),
      server: sv::Server::new(&self.db),
      user: sv::User::new(&self.db),
      admin: &self.admin,
    }
  }
}
