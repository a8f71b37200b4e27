//! Error types for the import pipeline.

use std::path::PathBuf;

use fide_core::{Category, Period};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] fide_core::Error),

  #[error("request to {url} failed: {source}")]
  Http {
    url:    String,
    #[source]
    source: reqwest::Error,
  },

  #[error("{url} answered {status}")]
  Status { url: String, status: reqwest::StatusCode },

  #[error("io error on {}: {source}", .path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("corrupt archive {}: {source}", .path.display())]
  Archive {
    path:   PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("no .xml or .txt data file in {}", .0.display())]
  NoDataFile(PathBuf),

  #[error("expected one data file in {}, found {}", .dir.display(), .files.len())]
  MultipleDataFiles { dir: PathBuf, files: Vec<PathBuf> },

  #[error("unsupported rating-list file {}: expected .zip, .xml or .txt", .0.display())]
  UnsupportedFile(PathBuf),

  #[error("parse error: {0}")]
  Parse(#[from] fide_lists::Error),

  /// An atomic batch was rolled back because one of its records failed.
  #[error("batch for {period} {category} rolled back: player {fide_id}: {message}")]
  PartialWrite {
    period:   Period,
    category: Category,
    fide_id:  u32,
    message:  String,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("invalid schedule {expression:?}: {source}")]
  Schedule {
    expression: String,
    #[source]
    source:     cron::error::Error,
  },

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("background task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  /// Infrastructure failures that should stop a multi-period sweep. Anything
  /// else only fails the period it happened in.
  pub fn is_fatal(&self) -> bool { matches!(self, Self::Store(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
