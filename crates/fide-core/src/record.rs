//! Normalised rating-list records, the common output of every list parser.

use serde::{Deserialize, Serialize};

use crate::{Category, player::PlayerProfile};

/// One player's line (or element) from a single-category rating list.
///
/// Blank fields are `None`, never zero or the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
  pub fide_id:    u32,
  pub name:       Option<String>,
  pub title:      Option<String>,
  pub federation: Option<String>,
  pub sex:        Option<String>,
  pub birth_year: Option<i32>,
  pub flag:       Option<String>,
  pub rating:     Option<i32>,
  pub games:      Option<i32>,
}

impl RatingRecord {
  pub fn new(fide_id: u32) -> Self { Self { fide_id, ..Default::default() } }

  /// The identity/profile half of the record.
  pub fn profile(&self) -> PlayerProfile {
    PlayerProfile {
      fide_id:    self.fide_id,
      name:       self.name.clone(),
      federation: self.federation.clone(),
      sex:        self.sex.clone(),
      title:      self.title.clone(),
      birth_year: self.birth_year,
      flag:       self.flag.clone(),
    }
  }

  /// The rating half of the record, tagged with the list's category.
  pub fn entry(&self, category: Category) -> CategoryEntry {
    CategoryEntry { category, rating: self.rating, games: self.games }
  }
}

/// A single category's `(rating, games)` pair destined for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
  pub category: Category,
  pub rating:   Option<i32>,
  pub games:    Option<i32>,
}

impl CategoryEntry {
  pub fn new(category: Category, rating: Option<i32>, games: Option<i32>) -> Self {
    Self { category, rating, games }
  }

  /// An entry without a rating carries nothing to store.
  pub fn is_empty(&self) -> bool { self.rating.is_none() }
}
