//! Encoding and decoding helpers between domain types and the plain-text /
//! integer representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, periods
//! are their `YYYYMMDD` display form and enums their lowercase names.

use chrono::{DateTime, NaiveDate, Utc};
use fide_core::{
  Category, Period,
  player::Player,
  run::{ImportRun, ImportStatus},
  snapshot::{CategoryRating, RatingSnapshot},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_category(s: &str) -> Result<Category> {
  s.parse()
    .map_err(|_| fide_core::Error::UnknownCategory(s.to_string()).into())
}

pub fn decode_status(s: &str) -> Result<ImportStatus> {
  s.parse()
    .map_err(|_| fide_core::Error::UnknownStatus(s.to_string()).into())
}

// ─── Integers ────────────────────────────────────────────────────────────────

pub fn decode_u32(column: &'static str, value: i64) -> Result<u32> {
  u32::try_from(value).map_err(|_| Error::OutOfRange { column, value })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `players` row.
pub struct RawPlayer {
  pub fide_id:       i64,
  pub name:          Option<String>,
  pub federation:    Option<String>,
  pub sex:           Option<String>,
  pub title:         Option<String>,
  pub birth_year:    Option<i32>,
  pub flag:          Option<String>,
  pub is_active:     Option<bool>,
  pub inactive_date: Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawPlayer {
  pub const COLUMNS: &'static str = "fide_id, name, federation, sex, title, birth_year, flag, \
     is_active, inactive_date, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fide_id:       row.get(0)?,
      name:          row.get(1)?,
      federation:    row.get(2)?,
      sex:           row.get(3)?,
      title:         row.get(4)?,
      birth_year:    row.get(5)?,
      flag:          row.get(6)?,
      is_active:     row.get(7)?,
      inactive_date: row.get(8)?,
      created_at:    row.get(9)?,
      updated_at:    row.get(10)?,
    })
  }

  pub fn into_player(self) -> Result<Player> {
    Ok(Player {
      fide_id:       decode_u32("fide_id", self.fide_id)?,
      name:          self.name,
      federation:    self.federation,
      sex:           self.sex,
      title:         self.title,
      birth_year:    self.birth_year,
      flag:          self.flag,
      is_active:     self.is_active,
      inactive_date: self.inactive_date.as_deref().map(decode_date).transpose()?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `ratings` row.
pub struct RawSnapshot {
  pub fide_id:         i64,
  pub period:          String,
  pub standard_rating: Option<i32>,
  pub standard_games:  Option<i32>,
  pub rapid_rating:    Option<i32>,
  pub rapid_games:     Option<i32>,
  pub blitz_rating:    Option<i32>,
  pub blitz_games:     Option<i32>,
}

impl RawSnapshot {
  pub const COLUMNS: &'static str = "fide_id, period, standard_rating, standard_games, \
     rapid_rating, rapid_games, blitz_rating, blitz_games";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fide_id:         row.get(0)?,
      period:          row.get(1)?,
      standard_rating: row.get(2)?,
      standard_games:  row.get(3)?,
      rapid_rating:    row.get(4)?,
      rapid_games:     row.get(5)?,
      blitz_rating:    row.get(6)?,
      blitz_games:     row.get(7)?,
    })
  }

  pub fn into_snapshot(self) -> Result<RatingSnapshot> {
    Ok(RatingSnapshot {
      fide_id:  decode_u32("fide_id", self.fide_id)?,
      period:   self.period.parse::<Period>()?,
      standard: CategoryRating { rating: self.standard_rating, games: self.standard_games },
      rapid:    CategoryRating { rating: self.rapid_rating, games: self.rapid_games },
      blitz:    CategoryRating { rating: self.blitz_rating, games: self.blitz_games },
    })
  }
}

/// Raw values read directly from a `rating_lists` row.
pub struct RawRun {
  pub period:         String,
  pub category:       String,
  pub status:         String,
  pub total_players:  i64,
  pub skipped:        i64,
  pub failed_records: i64,
  pub import_date:    String,
  pub error:          Option<String>,
}

impl RawRun {
  pub const COLUMNS: &'static str =
    "period, category, status, total_players, skipped, failed_records, import_date, error";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      period:         row.get(0)?,
      category:       row.get(1)?,
      status:         row.get(2)?,
      total_players:  row.get(3)?,
      skipped:        row.get(4)?,
      failed_records: row.get(5)?,
      import_date:    row.get(6)?,
      error:          row.get(7)?,
    })
  }

  pub fn into_run(self) -> Result<ImportRun> {
    Ok(ImportRun {
      period:         self.period.parse()?,
      category:       decode_category(&self.category)?,
      status:         decode_status(&self.status)?,
      total_players:  decode_u32("total_players", self.total_players)?,
      skipped:        decode_u32("skipped", self.skipped)?,
      failed_records: decode_u32("failed_records", self.failed_records)?,
      import_date:    decode_dt(&self.import_date)?,
      error:          self.error,
    })
  }
}
