//! `fide-import`: import FIDE rating lists into a SQLite store.
//!
//! Reads `fide-import.toml` (or the path given with `--config`) and `FIDE_*`
//! environment variables, opens the store, then runs one subcommand.
//!
//! ```text
//! fide-import import --period 2025-08 --category blitz
//! fide-import historical --start-year 2015 --category standard
//! fide-import schedule --cron "0 0 2 1 * *" --run-now
//! fide-import changes --fide-id 1503014 --window 12
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use fide_core::{
  Category, Period,
  changes::derive_changes,
  store::{RatingStore, WriteMode},
};
use fide_import::{Fetcher, Importer, ImporterConfig, SweepRange, schedule};
use fide_store_sqlite::SqliteStore;
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "FIDE rating-list importer")]
struct Cli {
  /// Path to a TOML configuration file.
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// SQLite database file.
  #[arg(long, global = true)]
  store: Option<PathBuf>,

  /// Where archives are downloaded and extracted.
  #[arg(long, global = true)]
  download_dir: Option<PathBuf>,

  /// Base URL of the rating-list downloads.
  #[arg(long, global = true)]
  base_url: Option<String>,

  /// Write each record under its own savepoint; bad records are skipped
  /// instead of failing the list.
  #[arg(long, global = true)]
  isolated: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Import one period (every configured category, or just one).
  Import {
    /// YYYYMMDD, YYYY-MM or YYYY-MM-DD.
    #[arg(long)]
    period:   Period,
    #[arg(long)]
    category: Option<Category>,
    /// Read the list from a local .zip, .xml or .txt file.
    #[arg(long, requires = "category")]
    file:     Option<PathBuf>,
  },

  /// Import the current month.
  Current,

  /// Import every month from a start year up to now.
  Historical {
    #[arg(long)]
    start_year:   Option<i32>,
    /// Last period to import (defaults to the current month).
    #[arg(long)]
    until:        Option<Period>,
    /// Restrict to these categories (repeatable).
    #[arg(long = "category")]
    categories:   Vec<Category>,
    /// Re-attempt lists whose last import failed.
    #[arg(long)]
    retry_failed: bool,
  },

  /// Import the current month on a cron schedule until interrupted.
  Schedule {
    /// Cron expression with seconds, e.g. "0 0 2 1 * *".
    #[arg(long)]
    cron:    Option<String>,
    /// Also import immediately on start-up.
    #[arg(long)]
    run_now: bool,
  },

  /// List import runs and store totals.
  Status,

  /// Print a player's month-over-month rating changes as JSON.
  Changes {
    #[arg(long)]
    fide_id: u32,
    /// Number of most recent periods to include.
    #[arg(long, default_value_t = 12)]
    window:  usize,
  },

  /// Mark players without games in the last N months as inactive.
  MarkInactive {
    #[arg(long)]
    months: Option<u32>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration, then apply command-line overrides.
  let mut cfg = ImporterConfig::load(cli.config.as_deref())
    .context("failed to load configuration")?;
  if let Some(store) = cli.store {
    cfg.store_path = store;
  }
  if let Some(dir) = cli.download_dir {
    cfg.download_dir = dir;
  }
  if let Some(url) = cli.base_url {
    cfg.base_url = url;
  }
  if cli.isolated {
    cfg.write_mode = WriteMode::Isolated;
  }
  cfg.store_path = expand_tilde(&cfg.store_path);
  cfg.download_dir = expand_tilde(&cfg.download_dir);

  // Open SQLite store.
  if let Some(parent) = cfg.store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  let fetcher = Fetcher::new(cfg.base_url.clone(), cfg.download_dir.clone(), cfg.timeout())
    .context("failed to build HTTP client")?;
  let importer = Importer::new(Arc::new(store), fetcher, cfg.import_settings());

  match cli.command {
    Command::Import { period, category: Some(category), file } => {
      let outcome = importer
        .import_rating_list(period, category, file.as_deref())
        .await
        .with_context(|| format!("import of {period} {category} failed"))?;
      print_json(&outcome)?;
    }
    Command::Import { period, category: None, .. } => {
      let report = importer.import_period(period).await.context("import aborted")?;
      print_json(&report)?;
    }
    Command::Current => {
      let report = importer.import_current_month().await.context("import aborted")?;
      print_json(&report)?;
    }
    Command::Historical { start_year, until, categories, retry_failed } => {
      let start = Period::new(start_year.unwrap_or(cfg.start_year), 1)?;
      let end = until.unwrap_or_else(Period::current);
      let mut range = SweepRange::new(start, end).retry_failed(retry_failed);
      if !categories.is_empty() {
        range = range.with_categories(categories);
      }
      let report = importer.import_range(range).await.context("sweep aborted")?;
      print_json(&report)?;
    }
    Command::Schedule { cron, run_now } => {
      let expression = cron.unwrap_or(cfg.schedule);
      let plan = schedule::parse_schedule(&expression)?;
      tracing::info!(schedule = %expression, "starting monthly schedule");
      schedule::run_monthly(&importer, &plan, run_now)
        .await
        .context("scheduler failed")?;
    }
    Command::Status => {
      let store = importer.store();
      for run in store.list_runs().await? {
        println!(
          "{} {:<8} {:<10} players={} skipped={} failed={}{}",
          run.period,
          run.category,
          run.status,
          run.total_players,
          run.skipped,
          run.failed_records,
          run.error.map(|e| format!(" error={e:?}")).unwrap_or_default(),
        );
      }
      let counts = store.counts().await?;
      println!(
        "players={} snapshots={} runs={}",
        counts.players, counts.snapshots, counts.runs
      );
    }
    Command::Changes { fide_id, window } => {
      let store = importer.store();
      let player = store
        .get_player(fide_id)
        .await?
        .with_context(|| format!("no player with FIDE id {fide_id}"))?;
      let history = store.rating_history(fide_id, Some(window)).await?;
      let changes = derive_changes(history, window);
      print_json(&serde_json::json!({
        "fide_id": player.fide_id,
        "name": player.name,
        "changes": changes,
      }))?;
    }
    Command::MarkInactive { months } => {
      let months = months.unwrap_or(cfg.inactive_months);
      let marked = importer.mark_inactive_players(months).await?;
      println!("marked {marked} player(s) inactive");
    }
  }

  Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
