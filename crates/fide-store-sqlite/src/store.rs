//! SQLite implementation of [`RatingStore`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, params};

use fide_core::{
  Category, Period,
  player::{Player, PlayerProfile},
  record::{CategoryEntry, RatingRecord},
  run::ImportRun,
  snapshot::{CategoryRating, RatingSnapshot},
  store::{BatchReport, RatingStore, RecordFailure, StoreCounts, WriteMode},
};

use crate::{
  Result,
  encode::{RawPlayer, RawRun, RawSnapshot, encode_date, encode_dt},
  schema::SCHEMA,
};

// ─── Row-level helpers ───────────────────────────────────────────────────────
//
// Synchronous; they run inside `Connection::call` against a plain connection,
// a transaction or a savepoint (the latter two deref to `Connection`).

fn upsert_player_row(
  conn: &rusqlite::Connection,
  profile: &PlayerProfile,
  now: &str,
) -> rusqlite::Result<()> {
  conn
    .prepare_cached(
      "INSERT INTO players (
         fide_id, name, federation, sex, title, birth_year, flag,
         created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
       ON CONFLICT(fide_id) DO UPDATE SET
         name       = excluded.name,
         federation = excluded.federation,
         sex        = excluded.sex,
         title      = excluded.title,
         birth_year = excluded.birth_year,
         flag       = excluded.flag,
         updated_at = excluded.updated_at",
    )?
    .execute(params![
      profile.fide_id,
      profile.name,
      profile.federation,
      profile.sex,
      profile.title,
      profile.birth_year,
      profile.flag,
      now,
    ])?;
  Ok(())
}

fn load_snapshot(
  conn: &rusqlite::Connection,
  fide_id: u32,
  period: Period,
) -> rusqlite::Result<Option<RatingSnapshot>> {
  conn
    .prepare_cached(
      "SELECT standard_rating, standard_games, rapid_rating, rapid_games,
              blitz_rating, blitz_games
       FROM ratings WHERE fide_id = ?1 AND period = ?2",
    )?
    .query_row(params![fide_id, period.to_string()], |row| {
      Ok(RatingSnapshot {
        fide_id,
        period,
        standard: CategoryRating { rating: row.get(0)?, games: row.get(1)? },
        rapid: CategoryRating { rating: row.get(2)?, games: row.get(3)? },
        blitz: CategoryRating { rating: row.get(4)?, games: row.get(5)? },
      })
    })
    .optional()
}

/// Read the `(fide_id, period)` row, merge `entry` into it and write it back.
/// Returns whether a row was written.
fn merge_entry(
  conn: &rusqlite::Connection,
  fide_id: u32,
  period: Period,
  entry: &CategoryEntry,
  now: &str,
) -> rusqlite::Result<bool> {
  if entry.is_empty() {
    return Ok(false);
  }

  let mut snapshot = load_snapshot(conn, fide_id, period)?
    .unwrap_or_else(|| RatingSnapshot::empty(fide_id, period));
  if !snapshot.apply(entry) {
    return Ok(false);
  }

  conn
    .prepare_cached(
      "INSERT INTO ratings (
         fide_id, period,
         standard_rating, standard_games, rapid_rating, rapid_games,
         blitz_rating, blitz_games, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
       ON CONFLICT(fide_id, period) DO UPDATE SET
         standard_rating = excluded.standard_rating,
         standard_games  = excluded.standard_games,
         rapid_rating    = excluded.rapid_rating,
         rapid_games     = excluded.rapid_games,
         blitz_rating    = excluded.blitz_rating,
         blitz_games     = excluded.blitz_games,
         updated_at      = excluded.updated_at",
    )?
    .execute(params![
      fide_id,
      period.to_string(),
      snapshot.standard.rating,
      snapshot.standard.games,
      snapshot.rapid.rating,
      snapshot.rapid.games,
      snapshot.blitz.rating,
      snapshot.blitz.games,
      now,
    ])?;
  Ok(true)
}

fn write_record(
  conn: &rusqlite::Connection,
  period: Period,
  category: Category,
  record: &RatingRecord,
  now: &str,
) -> rusqlite::Result<()> {
  upsert_player_row(conn, &record.profile(), now)?;
  merge_entry(conn, record.fide_id, period, &record.entry(category), now)?;
  Ok(())
}

/// Errors caused by the record's own values rather than the database.
fn is_record_error(err: &rusqlite::Error) -> bool {
  match err {
    rusqlite::Error::SqliteFailure(e, _) => {
      e.code == rusqlite::ErrorCode::ConstraintViolation
    }
    rusqlite::Error::ToSqlConversionFailure(_)
    | rusqlite::Error::IntegralValueOutOfRange(..) => true,
    _ => false,
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A FIDE rating store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store. Used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RatingStore impl ────────────────────────────────────────────────────────

impl RatingStore for SqliteStore {
  type Error = crate::Error;

  // ── Import runs ───────────────────────────────────────────────────────────

  async fn get_run(
    &self,
    period: Period,
    category: Category,
  ) -> Result<Option<ImportRun>> {
    let period_str = period.to_string();
    let category_str = category.as_str();

    let raw: Option<RawRun> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM rating_lists WHERE period = ?1 AND category = ?2",
                RawRun::COLUMNS
              ),
              params![period_str, category_str],
              RawRun::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRun::into_run).transpose()
  }

  async fn save_run(&self, run: ImportRun) -> Result<()> {
    let import_date = encode_dt(run.import_date);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO rating_lists (
             period, category, status, total_players, skipped,
             failed_records, import_date, error
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT(period, category) DO UPDATE SET
             status         = excluded.status,
             total_players  = excluded.total_players,
             skipped        = excluded.skipped,
             failed_records = excluded.failed_records,
             import_date    = excluded.import_date,
             error          = excluded.error",
          params![
            run.period.to_string(),
            run.category.as_str(),
            run.status.as_str(),
            run.total_players,
            run.skipped,
            run.failed_records,
            import_date,
            run.error,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_runs(&self) -> Result<Vec<ImportRun>> {
    let raws: Vec<RawRun> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM rating_lists ORDER BY period, category",
          RawRun::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawRun::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRun::into_run).collect()
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert_player(&self, profile: PlayerProfile) -> Result<()> {
    let now = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        upsert_player_row(conn, &profile, &now)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn upsert_rating_category(
    &self,
    fide_id: u32,
    period: Period,
    entry: CategoryEntry,
  ) -> Result<bool> {
    let now = encode_dt(Utc::now());

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let written = merge_entry(&tx, fide_id, period, &entry, &now)?;
        tx.commit()?;
        Ok(written)
      })
      .await?;
    Ok(written)
  }

  async fn write_batch(
    &self,
    period: Period,
    category: Category,
    records: Vec<RatingRecord>,
    mode: WriteMode,
  ) -> Result<BatchReport> {
    let now = encode_dt(Utc::now());

    let report = self
      .conn
      .call(move |conn| {
        let mut tx = conn.transaction()?;
        let mut report = BatchReport::default();

        for record in &records {
          match mode {
            WriteMode::Atomic => {
              if let Err(e) = write_record(&tx, period, category, record, &now) {
                if !is_record_error(&e) {
                  return Err(e.into());
                }
                tx.rollback()?;
                report.written = 0;
                report.rolled_back = true;
                report
                  .failures
                  .push(RecordFailure { fide_id: record.fide_id, message: e.to_string() });
                return Ok(report);
              }
            }
            WriteMode::Isolated => {
              let sp = tx.savepoint()?;
              match write_record(&sp, period, category, record, &now) {
                Ok(()) => sp.commit()?,
                Err(e) if is_record_error(&e) => {
                  // Dropping the savepoint rolls back this record only.
                  drop(sp);
                  report
                    .failures
                    .push(RecordFailure { fide_id: record.fide_id, message: e.to_string() });
                  continue;
                }
                Err(e) => return Err(e.into()),
              }
            }
          }
          report.written += 1;
        }

        tx.commit()?;
        Ok(report)
      })
      .await?;

    if report.rolled_back {
      tracing::debug!(%period, %category, "batch rolled back");
    }
    Ok(report)
  }

  async fn mark_inactive(
    &self,
    since: Period,
    inactive_date: NaiveDate,
  ) -> Result<u64> {
    let since_str = since.to_string();
    let date_str = encode_date(inactive_date);
    let now = encode_dt(Utc::now());

    let marked = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE players
           SET is_active = 0, inactive_date = ?2, updated_at = ?3
           WHERE is_active IS NOT 0
             AND NOT EXISTS (
               SELECT 1 FROM ratings r
               WHERE r.fide_id = players.fide_id
                 AND r.period >= ?1
                 AND (COALESCE(r.standard_games, 0) > 0
                   OR COALESCE(r.rapid_games, 0) > 0
                   OR COALESCE(r.blitz_games, 0) > 0)
             )",
          params![since_str, date_str, now],
        )?;
        Ok(n as u64)
      })
      .await?;
    Ok(marked)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_player(&self, fide_id: u32) -> Result<Option<Player>> {
    let raw: Option<RawPlayer> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM players WHERE fide_id = ?1", RawPlayer::COLUMNS),
              params![fide_id],
              RawPlayer::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPlayer::into_player).transpose()
  }

  async fn get_snapshot(
    &self,
    fide_id: u32,
    period: Period,
  ) -> Result<Option<RatingSnapshot>> {
    let snapshot = self
      .conn
      .call(move |conn| Ok(load_snapshot(conn, fide_id, period)?))
      .await?;
    Ok(snapshot)
  }

  async fn rating_history(
    &self,
    fide_id: u32,
    limit: Option<usize>,
  ) -> Result<Vec<RatingSnapshot>> {
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val = limit.map_or(-1, |n| n as i64);

    let raws: Vec<RawSnapshot> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT * FROM (
             SELECT {} FROM ratings WHERE fide_id = ?1
             ORDER BY period DESC LIMIT ?2
           ) ORDER BY period ASC",
          RawSnapshot::COLUMNS
        ))?;
        let rows = stmt
          .query_map(params![fide_id, limit_val], RawSnapshot::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSnapshot::into_snapshot).collect()
  }

  async fn counts(&self) -> Result<StoreCounts> {
    let (players, snapshots, runs): (i64, i64, i64) = self
      .conn
      .call(|conn| {
        let count = |table: &str| -> rusqlite::Result<i64> {
          conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        };
        Ok((count("players")?, count("ratings")?, count("rating_lists")?))
      })
      .await?;

    Ok(StoreCounts {
      players:   players as u64,
      snapshots: snapshots as u64,
      runs:      runs as u64,
    })
  }
}
