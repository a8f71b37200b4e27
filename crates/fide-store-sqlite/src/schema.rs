//! SQL schema for the FIDE SQLite store.
//!
//! Executed once at connection startup; `PRAGMA user_version` records the
//! schema revision for later migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS players (
    fide_id       INTEGER PRIMARY KEY CHECK (fide_id > 0),
    name          TEXT,
    federation    TEXT,
    sex           TEXT,
    title         TEXT,
    birth_year    INTEGER,
    flag          TEXT,
    is_active     INTEGER,         -- NULL until activity inference runs
    inactive_date TEXT,            -- YYYY-MM-DD
    created_at    TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at    TEXT NOT NULL
);

-- One row per (player, month). Each category is filled in by its own list.
CREATE TABLE IF NOT EXISTS ratings (
    id              INTEGER PRIMARY KEY,
    fide_id         INTEGER NOT NULL REFERENCES players(fide_id),
    period          TEXT NOT NULL,  -- YYYYMMDD, day always 01
    standard_rating INTEGER CHECK (standard_rating >= 0),
    standard_games  INTEGER CHECK (standard_games >= 0),
    rapid_rating    INTEGER CHECK (rapid_rating >= 0),
    rapid_games     INTEGER CHECK (rapid_games >= 0),
    blitz_rating    INTEGER CHECK (blitz_rating >= 0),
    blitz_games     INTEGER CHECK (blitz_games >= 0),
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE (fide_id, period)
);

-- Import bookkeeping; the completion flag for each published list.
CREATE TABLE IF NOT EXISTS rating_lists (
    period         TEXT NOT NULL,
    category       TEXT NOT NULL,   -- 'standard' | 'rapid' | 'blitz'
    status         TEXT NOT NULL,   -- 'pending' | 'processing' | 'completed' | 'failed'
    total_players  INTEGER NOT NULL DEFAULT 0,
    skipped        INTEGER NOT NULL DEFAULT 0,
    failed_records INTEGER NOT NULL DEFAULT 0,
    import_date    TEXT NOT NULL,
    error          TEXT,
    PRIMARY KEY (period, category)
);

CREATE INDEX IF NOT EXISTS ratings_period_idx ON ratings(period);
CREATE INDEX IF NOT EXISTS players_federation_idx ON players(federation);

PRAGMA user_version = 1;
";
