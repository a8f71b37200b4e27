//! Monthly scheduled imports.
//!
//! FIDE publishes new lists at the start of each month. In scheduled mode the
//! importer sleeps until the next slot of a cron expression (UTC), imports
//! the current month, and repeats until interrupted.
//!
//! Expressions use the `cron` crate's six-field form
//! `sec min hour day-of-month month day-of-week`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use fide_core::store::RatingStore;

use crate::{Error, Result, fetch::ListSource, importer::Importer};

/// The 1st of every month at 02:00 UTC.
pub const DEFAULT_SCHEDULE: &str = "0 0 2 1 * *";

pub fn parse_schedule(expression: &str) -> Result<Schedule> {
  Schedule::from_str(expression).map_err(|source| Error::Schedule {
    expression: expression.to_string(),
    source,
  })
}

/// The first slot of `schedule` strictly after `now`.
pub fn next_run_after(schedule: &Schedule, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
  schedule.after(&now).next()
}

/// Run [`Importer::import_current_month`] at every slot of `schedule` until
/// Ctrl-C. With `run_now` an import also runs immediately.
///
/// A failed import is logged and the schedule continues.
pub async fn run_monthly<S, F>(
  importer: &Importer<S, F>,
  schedule: &Schedule,
  run_now: bool,
) -> Result<()>
where
  S: RatingStore,
  F: ListSource,
{
  if run_now {
    run_once(importer).await;
  }

  loop {
    let now = Utc::now();
    let Some(next) = next_run_after(schedule, now) else {
      tracing::warn!("schedule has no upcoming runs, stopping");
      return Ok(());
    };
    let wait = (next - now).to_std().unwrap_or_default();
    tracing::info!(next = %next, "next scheduled import");

    tokio::select! {
      _ = tokio::time::sleep(wait) => run_once(importer).await,
      _ = tokio::signal::ctrl_c() => {
        tracing::info!("received Ctrl-C, stopping scheduler");
        return Ok(());
      }
    }
  }
}

async fn run_once<S, F>(importer: &Importer<S, F>)
where
  S: RatingStore,
  F: ListSource,
{
  match importer.import_current_month().await {
    Ok(report) if !report.failures.is_empty() => {
      tracing::warn!(failed = report.failures.len(), "scheduled import had failures");
    }
    Ok(_) => {}
    Err(e) => tracing::error!(error = %e, "scheduled import aborted"),
  }
}
