//! The import orchestrator.
//!
//! One [`Importer`] drives every kind of import: a single list, one period,
//! the current month, or a sweep over a range of periods. Each list is
//! tracked by an [`ImportRun`] keyed by `(period, category)`; a `Completed`
//! run is never imported again.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use chrono::Utc;
use fide_core::{
  Category, Period,
  run::{ImportRun, ImportStatus},
  store::{RatingStore, WriteMode},
};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
  Error, Result,
  fetch::{DataFile, FetchOutcome, ListSource},
  locks::KeyedLocks,
};

// ─── Settings ────────────────────────────────────────────────────────────────

/// Knobs for an [`Importer`].
#[derive(Debug, Clone)]
pub struct ImportSettings {
  /// Records per store transaction.
  pub batch_size:        usize,
  pub write_mode:        WriteMode,
  /// Categories imported by period-level operations.
  pub categories:        Vec<Category>,
  /// Log progress every this many records.
  pub progress_interval: usize,
  /// Where local archives are extracted.
  pub download_dir:      PathBuf,
}

impl Default for ImportSettings {
  fn default() -> Self {
    Self {
      batch_size:        1000,
      write_mode:        WriteMode::Atomic,
      categories:        Category::ALL.to_vec(),
      progress_interval: 10_000,
      download_dir:      PathBuf::from("data/downloads"),
    }
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Counts for one imported list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
  pub period:    Period,
  pub category:  Category,
  /// Records written.
  pub imported:  usize,
  /// Lines or elements the parser dropped.
  pub malformed: usize,
  /// Records rolled back individually (isolated writes only).
  pub failed:    usize,
}

/// What [`Importer::import_rating_list`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImportOutcome {
  Imported(ImportSummary),
  /// The run was already `Completed`; nothing was written.
  AlreadyCompleted,
  /// The source has no list for this period yet; the run is `Pending`.
  Unavailable,
  /// A sweep left a `Failed` run alone because retries were not requested.
  SkippedFailed,
}

/// Which lists a sweep covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepRange {
  pub start:        Period,
  /// Inclusive.
  pub end:          Period,
  /// `None` uses the importer's configured categories.
  pub categories:   Option<Vec<Category>>,
  /// Re-attempt lists whose last run failed.
  pub retry_failed: bool,
}

impl SweepRange {
  pub fn new(start: Period, end: Period) -> Self {
    Self { start, end, categories: None, retry_failed: false }
  }

  /// Exactly one period.
  pub fn single(period: Period) -> Self { Self::new(period, period) }

  pub fn with_categories(mut self, categories: impl Into<Vec<Category>>) -> Self {
    self.categories = Some(categories.into());
    self
  }

  pub fn retry_failed(mut self, retry: bool) -> Self {
    self.retry_failed = retry;
    self
  }
}

/// A per-list failure recorded during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
  pub period:   Period,
  pub category: Category,
  pub error:    String,
}

/// Tallies for a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  pub imported:          usize,
  pub already_completed: usize,
  pub unavailable:       usize,
  pub skipped_failed:    usize,
  pub failures:          Vec<SweepFailure>,
}

impl SweepReport {
  fn record(&mut self, outcome: ImportOutcome) {
    match outcome {
      ImportOutcome::Imported(_) => self.imported += 1,
      ImportOutcome::AlreadyCompleted => self.already_completed += 1,
      ImportOutcome::Unavailable => self.unavailable += 1,
      ImportOutcome::SkippedFailed => self.skipped_failed += 1,
    }
  }
}

// ─── Importer ────────────────────────────────────────────────────────────────

/// Drives imports from a [`ListSource`] into a [`RatingStore`].
pub struct Importer<S, F> {
  store:    Arc<S>,
  source:   F,
  settings: ImportSettings,
  locks:    KeyedLocks<(Period, Category)>,
  /// Shared by imports; held exclusively by activity inference.
  pipeline: RwLock<()>,
}

impl<S, F> Importer<S, F>
where
  S: RatingStore,
  F: ListSource,
{
  pub fn new(store: Arc<S>, source: F, settings: ImportSettings) -> Self {
    Self {
      store,
      source,
      settings,
      locks: KeyedLocks::new(),
      pipeline: RwLock::new(()),
    }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn settings(&self) -> &ImportSettings { &self.settings }

  /// Import one list.
  ///
  /// With `local_file` the list is read from disk instead of the source. A
  /// `Failed` run is retried.
  pub async fn import_rating_list(
    &self,
    period: Period,
    category: Category,
    local_file: Option<&Path>,
  ) -> Result<ImportOutcome> {
    self.import_guarded(period, category, local_file, true).await
  }

  /// Import every configured category of `period`.
  pub async fn import_period(&self, period: Period) -> Result<SweepReport> {
    self
      .import_range(SweepRange::single(period).retry_failed(true))
      .await
  }

  pub async fn import_current_month(&self) -> Result<SweepReport> {
    self.import_period(Period::current()).await
  }

  /// Every month from January of `start_year` through the current month.
  pub async fn import_historical_data(&self, start_year: i32) -> Result<SweepReport> {
    let start = Period::new(start_year, 1)?;
    self
      .import_range(SweepRange::new(start, Period::current()))
      .await
  }

  /// Import every list in `range`, oldest first.
  ///
  /// A list that fails is recorded in the report and the sweep moves on.
  /// Only store failures abort the sweep.
  pub async fn import_range(&self, range: SweepRange) -> Result<SweepReport> {
    let categories = range
      .categories
      .clone()
      .unwrap_or_else(|| self.settings.categories.clone());
    let mut report = SweepReport::default();

    tracing::info!(
      start = %range.start,
      end = %range.end,
      ?categories,
      retry_failed = range.retry_failed,
      "starting import sweep"
    );

    for period in Period::range(range.start, range.end) {
      for &category in &categories {
        match self
          .import_guarded(period, category, None, range.retry_failed)
          .await
        {
          Ok(outcome) => report.record(outcome),
          Err(e) if e.is_fatal() => {
            tracing::error!(%period, %category, error = %e, "store failure, aborting sweep");
            return Err(e);
          }
          Err(e) => report.failures.push(SweepFailure {
            period,
            category,
            error: e.to_string(),
          }),
        }
      }
    }

    tracing::info!(
      imported = report.imported,
      already_completed = report.already_completed,
      unavailable = report.unavailable,
      skipped_failed = report.skipped_failed,
      failed = report.failures.len(),
      "import sweep finished"
    );
    Ok(report)
  }

  /// Mark players with no games in the last `months` months as inactive.
  /// Waits for running imports to finish and blocks new ones meanwhile.
  pub async fn mark_inactive_players(&self, months: u32) -> Result<u64> {
    let _pipeline = self.pipeline.write().await;

    let since = Period::current().months_back(months);
    let marked = self
      .store
      .mark_inactive(since, since.first_day())
      .await
      .map_err(Error::store)?;

    tracing::info!(%since, marked, "marked inactive players");
    Ok(marked)
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  async fn import_guarded(
    &self,
    period: Period,
    category: Category,
    local_file: Option<&Path>,
    retry_failed: bool,
  ) -> Result<ImportOutcome> {
    let _pipeline = self.pipeline.read().await;
    let _key = self.locks.lock((period, category)).await;

    let existing = self
      .store
      .get_run(period, category)
      .await
      .map_err(Error::store)?;

    match existing.as_ref().map(|r| r.status) {
      Some(ImportStatus::Completed) => {
        tracing::debug!(%period, %category, "already imported");
        return Ok(ImportOutcome::AlreadyCompleted);
      }
      Some(ImportStatus::Failed) if !retry_failed => {
        tracing::debug!(%period, %category, "skipping failed list");
        return Ok(ImportOutcome::SkippedFailed);
      }
      Some(ImportStatus::Failed) => {
        let error = existing.as_ref().and_then(|r| r.error.as_deref());
        tracing::info!(%period, %category, ?error, "retrying failed import");
      }
      Some(ImportStatus::Processing) => {
        tracing::warn!(%period, %category, "resuming interrupted import");
      }
      Some(ImportStatus::Pending) | None => {}
    }

    let mut run = ImportRun::processing(period, category);
    self.save(run.clone()).await?;

    match self.run_import(period, category, local_file).await {
      Ok(Some(summary)) => {
        run.status = ImportStatus::Completed;
        run.total_players = summary.imported as u32;
        run.skipped = summary.malformed as u32;
        run.failed_records = summary.failed as u32;
        run.import_date = Utc::now();
        self.save(run).await?;

        tracing::info!(
          %period,
          %category,
          imported = summary.imported,
          malformed = summary.malformed,
          failed = summary.failed,
          "import completed"
        );
        Ok(ImportOutcome::Imported(summary))
      }
      Ok(None) => {
        run.status = ImportStatus::Pending;
        run.import_date = Utc::now();
        self.save(run).await?;
        Ok(ImportOutcome::Unavailable)
      }
      Err(e) if e.is_fatal() => Err(e),
      Err(e) => {
        tracing::error!(%period, %category, error = %e, "import failed");
        run.status = ImportStatus::Failed;
        run.error = Some(e.to_string());
        run.import_date = Utc::now();
        self.save(run).await?;
        Err(e)
      }
    }
  }

  /// Locate, parse and write one list. `Ok(None)` means the source has no
  /// list for `period`.
  async fn run_import(
    &self,
    period: Period,
    category: Category,
    local_file: Option<&Path>,
  ) -> Result<Option<ImportSummary>> {
    let data = match local_file {
      Some(path) => {
        DataFile::from_local(path, &self.settings.download_dir).await?
      }
      None => match self.source.fetch(period, category).await? {
        FetchOutcome::Ready(file) => file,
        FetchOutcome::Unavailable { url, reason } => {
          tracing::warn!(%period, %category, %url, %reason, "rating list not available");
          return Ok(None);
        }
      },
    };

    tracing::info!(%period, %category, path = %data.path.display(), "parsing rating list");
    let bytes = data.read().await?;
    let format = data.format;
    let list =
      tokio::task::spawn_blocking(move || fide_lists::parse(&bytes, format)).await??;

    let total = list.records.len();
    let batch_size = self.settings.batch_size.max(1);
    let interval = self.settings.progress_interval.max(1);
    let mut summary = ImportSummary {
      period,
      category,
      imported: 0,
      malformed: list.malformed,
      failed: 0,
    };
    let mut next_progress = interval;

    let mut records = list.records.into_iter();
    loop {
      let batch: Vec<_> = records.by_ref().take(batch_size).collect();
      if batch.is_empty() {
        break;
      }

      let report = self
        .store
        .write_batch(period, category, batch, self.settings.write_mode)
        .await
        .map_err(Error::store)?;

      if report.rolled_back {
        let first = report.failures.into_iter().next();
        return Err(Error::PartialWrite {
          period,
          category,
          fide_id: first.as_ref().map_or(0, |f| f.fide_id),
          message: first.map(|f| f.message).unwrap_or_default(),
        });
      }
      for failure in &report.failures {
        tracing::warn!(
          %period,
          %category,
          fide_id = failure.fide_id,
          error = %failure.message,
          "record rolled back"
        );
      }

      summary.imported += report.written;
      summary.failed += report.failures.len();

      if summary.imported >= next_progress {
        tracing::info!(%period, %category, written = summary.imported, total, "import progress");
        next_progress = summary.imported + interval;
      }
    }

    Ok(Some(summary))
  }

  async fn save(&self, run: ImportRun) -> Result<()> {
    self.store.save_run(run).await.map_err(Error::store)
  }
}
