//! The `RatingStore` trait and supporting write types.
//!
//! The trait is implemented by storage backends (e.g. `fide-store-sqlite`).
//! The importer depends on this abstraction, not on any concrete backend, and
//! is handed an explicitly opened store.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Category, Period,
  player::{Player, PlayerProfile},
  record::{CategoryEntry, RatingRecord},
  run::ImportRun,
  snapshot::RatingSnapshot,
};

// ─── Write types ─────────────────────────────────────────────────────────────

/// How [`RatingStore::write_batch`] reacts to a record that cannot be written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
  /// The first failing record rolls back the whole batch.
  #[default]
  Atomic,
  /// Each record is written under its own savepoint; a failing record is
  /// rolled back alone, tallied, and the rest of the batch commits.
  Isolated,
}

/// A record that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
  pub fide_id: u32,
  pub message: String,
}

/// Outcome of one [`RatingStore::write_batch`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
  /// Records whose writes were committed.
  pub written:     usize,
  pub failures:    Vec<RecordFailure>,
  /// Set in [`WriteMode::Atomic`] when a failure discarded the batch.
  pub rolled_back: bool,
}

/// Row counts across the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
  pub players:   u64,
  pub snapshots: u64,
  pub runs:      u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a rating store backend.
///
/// Backends are the sole writers of players and snapshots during an import.
/// Snapshot writes must go through [`RatingSnapshot::apply`] so that one
/// category never clobbers another.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait RatingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Import runs ───────────────────────────────────────────────────────

  /// The bookkeeping row for `(period, category)`, if any attempt was made.
  fn get_run(
    &self,
    period: Period,
    category: Category,
  ) -> impl Future<Output = Result<Option<ImportRun>, Self::Error>> + Send + '_;

  /// Insert or replace the bookkeeping row keyed by the run's
  /// `(period, category)`.
  fn save_run(
    &self,
    run: ImportRun,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All runs, oldest period first.
  fn list_runs(
    &self,
  ) -> impl Future<Output = Result<Vec<ImportRun>, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert the player, or overwrite every profile field of an existing one
  /// (last write wins). Activity fields are left alone.
  fn upsert_player(
    &self,
    profile: PlayerProfile,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Merge one category's values into the `(fide_id, period)` snapshot.
  ///
  /// Creates the snapshot if absent; otherwise only the entry's category
  /// changes. An entry without a rating writes nothing. Returns whether a
  /// row was written.
  fn upsert_rating_category(
    &self,
    fide_id: u32,
    period: Period,
    entry: CategoryEntry,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Upsert the player and the `category` entry of every record, in order,
  /// inside a single transaction.
  ///
  /// Record-level failures are reported in the [`BatchReport`]; `Err` is
  /// reserved for the store itself being unusable.
  fn write_batch(
    &self,
    period: Period,
    category: Category,
    records: Vec<RatingRecord>,
    mode: WriteMode,
  ) -> impl Future<Output = Result<BatchReport, Self::Error>> + Send + '_;

  /// Mark every player without a game in any category in any period
  /// `>= since` as inactive as of `inactive_date`. Players already marked
  /// inactive are left alone. Returns the number of players marked.
  fn mark_inactive(
    &self,
    since: Period,
    inactive_date: NaiveDate,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_player(
    &self,
    fide_id: u32,
  ) -> impl Future<Output = Result<Option<Player>, Self::Error>> + Send + '_;

  fn get_snapshot(
    &self,
    fide_id: u32,
    period: Period,
  ) -> impl Future<Output = Result<Option<RatingSnapshot>, Self::Error>> + Send + '_;

  /// The player's most recent `limit` snapshots (all when `None`), in
  /// chronological order.
  fn rating_history(
    &self,
    fide_id: u32,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<RatingSnapshot>, Self::Error>> + Send + '_;

  fn counts(
    &self,
  ) -> impl Future<Output = Result<StoreCounts, Self::Error>> + Send + '_;
}
