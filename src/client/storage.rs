use std::{
  io::{self, ErrorKind},
  path::{Path, PathBuf},
};

use tokio::fs;

use super::CachedLicense;
use crate::prelude::*;

/// JSON file holding the last successful validation.
#[derive(Debug, Clone)]
pub struct Storage {
  path: PathBuf,
}

impl Storage {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// A missing or unreadable file counts as no license.
  pub async fn load(&self) -> Option<CachedLicense> {
    let bytes = match fs::read(&self.path).await {
      Ok(bytes) => bytes,
      Err(err) if err.kind() == ErrorKind::NotFound => return None,
      Err(err) => {
        warn!("Failed to read license cache {}: {err}", self.path.display());
        return None;
      }
    };

    match json::from_slice(&bytes) {
      Ok(cached) => Some(cached),
      Err(err) => {
        warn!("Discarding corrupt license cache {}: {err}", self.path.display());
        None
      }
    }
  }

  pub async fn save(&self, license: &CachedLicense) -> io::Result<()> {
    let bytes = json::to_vec_pretty(license)?;

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).await?;
    }

    // readers never observe a half-written file
    let tmp = self.path.with_extension("tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, &self.path).await
  }

  pub async fn clear(&self) -> io::Result<()> {
    match fs::remove_file(&self.path).await {
      Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
      _ => Ok(()),
    }
  }
}
