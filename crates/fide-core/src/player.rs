//! Player identity and profile.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One row per FIDE identity. Created on first sighting in any imported list;
/// profile fields are overwritten by every later import that includes the
/// player. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
  pub fide_id:       u32,
  pub name:          Option<String>,
  /// Three-letter federation code, e.g. `"NOR"`.
  pub federation:    Option<String>,
  pub sex:           Option<String>,
  /// GM, IM, FM, WGM, …
  pub title:         Option<String>,
  /// As published by FIDE; historically unreliable.
  pub birth_year:    Option<i32>,
  /// FIDE status flag, e.g. `"i"` (inactive) or `"wi"`.
  pub flag:          Option<String>,
  /// `None` means "assume active". Only written by activity inference.
  pub is_active:     Option<bool>,
  pub inactive_date: Option<NaiveDate>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::RatingStore::upsert_player`]: the profile fields
/// carried by a rating list. Timestamps and activity fields are owned by the
/// store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
  pub fide_id:    u32,
  pub name:       Option<String>,
  pub federation: Option<String>,
  pub sex:        Option<String>,
  pub title:      Option<String>,
  pub birth_year: Option<i32>,
  pub flag:       Option<String>,
}

impl PlayerProfile {
  pub fn new(fide_id: u32) -> Self { Self { fide_id, ..Default::default() } }
}
