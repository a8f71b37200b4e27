//! Import bookkeeping: one [`ImportRun`] per `(period, category)` attempted.
//!
//! A run is the explicit completion flag for a rating list: once `Completed`,
//! the list is never re-imported; anything else is retried.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{Category, Period};

/// `Pending → Processing → Completed`, with `Failed` recorded on error.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImportStatus {
  /// Known but not imported yet (e.g. the list was not published).
  Pending,
  /// An import started and has not finished. Left behind by a crash.
  Processing,
  Completed,
  Failed,
}

impl ImportStatus {
  pub fn as_str(self) -> &'static str { self.into() }
}

/// A row of the `rating_lists` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRun {
  pub period:         Period,
  pub category:       Category,
  pub status:         ImportStatus,
  /// Records written by the last attempt.
  pub total_players:  u32,
  /// Malformed lines/elements dropped by the parser.
  pub skipped:        u32,
  /// Records whose write failed and was rolled back individually.
  pub failed_records: u32,
  pub import_date:    DateTime<Utc>,
  /// Error text from the last failed attempt.
  pub error:          Option<String>,
}

impl ImportRun {
  /// A fresh run in `Processing` state, stamped now.
  pub fn processing(period: Period, category: Category) -> Self {
    Self {
      period,
      category,
      status: ImportStatus::Processing,
      total_players: 0,
      skipped: 0,
      failed_records: 0,
      import_date: Utc::now(),
      error: None,
    }
  }

  pub fn is_completed(&self) -> bool { self.status == ImportStatus::Completed }
}
