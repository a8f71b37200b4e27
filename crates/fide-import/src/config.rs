//! Importer configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `FIDE_*` environment variables (`FIDE_STORE_PATH`,
//! `FIDE_BATCH_SIZE`, `FIDE_CATEGORIES=standard,blitz`, …). Command-line
//! flags are applied on top by the binary.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use fide_core::{Category, store::WriteMode};
use serde::Deserialize;

use crate::{Result, fetch, importer::ImportSettings, schedule};

/// Default config file, read when present.
pub const DEFAULT_CONFIG_FILE: &str = "fide-import.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
  pub store_path:        PathBuf,
  pub download_dir:      PathBuf,
  pub base_url:          String,
  pub timeout_secs:      u64,
  pub batch_size:        usize,
  pub write_mode:        WriteMode,
  pub categories:        Vec<Category>,
  pub progress_interval: usize,
  /// Cron expression (UTC, with seconds) for scheduled imports.
  pub schedule:          String,
  /// First year of a historical sweep.
  pub start_year:        i32,
  /// Months without games before a player is marked inactive.
  pub inactive_months:   u32,
}

impl Default for ImporterConfig {
  fn default() -> Self {
    let settings = ImportSettings::default();
    Self {
      store_path:        PathBuf::from("data/fide_ratings.db"),
      download_dir:      settings.download_dir,
      base_url:          fetch::DEFAULT_BASE_URL.to_string(),
      timeout_secs:      fetch::DEFAULT_TIMEOUT.as_secs(),
      batch_size:        settings.batch_size,
      write_mode:        settings.write_mode,
      categories:        settings.categories,
      progress_interval: settings.progress_interval,
      schedule:          schedule::DEFAULT_SCHEDULE.to_string(),
      start_year:        2015,
      inactive_months:   24,
    }
  }
}

impl ImporterConfig {
  /// Load from `path` (required to exist) or from [`DEFAULT_CONFIG_FILE`]
  /// (optional), overlaid with the environment.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let file = match path {
      Some(p) => config::File::from(p).required(true),
      None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let settings = config::Config::builder()
      .add_source(file)
      .add_source(
        config::Environment::with_prefix("FIDE")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("categories"),
      )
      .build()?;

    Ok(settings.try_deserialize()?)
  }

  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

  pub fn import_settings(&self) -> ImportSettings {
    ImportSettings {
      batch_size:        self.batch_size,
      write_mode:        self.write_mode,
      categories:        self.categories.clone(),
      progress_interval: self.progress_interval,
      download_dir:      self.download_dir.clone(),
    }
  }
}
