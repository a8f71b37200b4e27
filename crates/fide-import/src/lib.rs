//! The FIDE rating-list import pipeline.
//!
//! Downloads FIDE's monthly rating lists, parses them with [`fide_lists`],
//! and merges them into any [`fide_core::store::RatingStore`]. The
//! `fide-import` binary wires this to the SQLite backend.

pub mod config;
pub mod error;
pub mod fetch;
pub mod importer;
pub mod locks;
pub mod schedule;

pub use config::ImporterConfig;
pub use error::{Error, Result};
pub use fetch::{DataFile, FetchOutcome, Fetcher, ListSource};
pub use importer::{
  ImportOutcome, ImportSettings, ImportSummary, Importer, SweepFailure, SweepRange,
  SweepReport,
};
