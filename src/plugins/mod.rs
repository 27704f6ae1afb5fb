pub mod server;

use tokio::task::JoinHandle;

use crate::{prelude::*, state::AppState};

/// Pause before a crashed service is started again.
const RESTART_DELAY: Duration = Duration::from_secs(5);

#[async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> &'static str {
    std::any::type_name::<Self>()
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct App {
  plugins: Vec<Arc<dyn Plugin>>,
}

impl App {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register<P: Plugin + 'static>(mut self, plugin: P) -> Self {
    self.plugins.push(Arc::new(plugin));
    self
  }

  /// Spawns one supervisor per plugin. Aborting a returned handle stops
  /// that supervisor; the service it is running is restarted no more.
  pub async fn run(self, app: Arc<AppState>) -> Vec<JoinHandle<()>> {
    self
      .plugins
      .into_iter()
      .map(|plugin| tokio::spawn(supervise(plugin, app.clone())))
      .collect()
  }
}

async fn supervise(plugin: Arc<dyn Plugin>, app: Arc<AppState>) {
  let name = plugin.name();
  info!("Service `{name}` initialized");

  loop {
    let handle = tokio::spawn({
      let plugin = plugin.clone();
      let app = app.clone();
      async move { plugin.start(app).await }
    });

    match handle.await {
      Ok(Ok(())) => warn!("Service `{name}` stopped unexpectedly"),
      Ok(Err(err)) => error!("Service `{name}` crashed: {err:#}"),
      Err(err) if err.is_cancelled() => {
        info!("Service `{name}` shut down");
        break;
      }
      Err(_) => error!("Service `{name}` panicked"),
    }

    time::sleep(RESTART_DELAY).await;
    info!("Restarting service `{name}`");
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::config::Config;

  struct Flaky(Arc<AtomicUsize>);

  #[async_trait]
  impl Plugin for Flaky {
    fn name(&self) -> &'static str {
      "flaky"
    }

    async fn start(&self, _app: Arc<AppState>) -> anyhow::Result<()> {
      self.0.fetch_add(1, Ordering::SeqCst);
      anyhow::bail!("boom")
    }
  }

  #[tokio::test]
  async fn test_supervisor_starts_each_plugin() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let app = Arc::new(AppState::with_db(db, Config::default()));
    let starts = Arc::new(AtomicUsize::new(0));

    let handles = App::new().register(Flaky(starts.clone())).run(app).await;
    assert_eq!(handles.len(), 1);

    time::sleep(Duration::from_millis(100)).await;
    assert_eq!(starts.load(Ordering::SeqCst), 1);

    for handle in handles {
      handle.abort();
    }
  }
}
