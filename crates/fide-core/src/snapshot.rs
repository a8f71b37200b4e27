//! Monthly rating snapshots and the category merge rule.
//!
//! A snapshot holds up to three independent `(rating, games)` pairs for one
//! `(fide_id, period)`. Each category arrives in its own file, so a snapshot is
//! assembled over several imports. [`RatingSnapshot::apply`] is the only place
//! the merge rule is written down; every storage backend goes through it.

use serde::{Deserialize, Serialize};

use crate::{Category, Period, record::CategoryEntry};

/// The stored values for one category within a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRating {
  pub rating: Option<i32>,
  pub games:  Option<i32>,
}

/// One row per `(fide_id, period)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSnapshot {
  pub fide_id:  u32,
  pub period:   Period,
  pub standard: CategoryRating,
  pub rapid:    CategoryRating,
  pub blitz:    CategoryRating,
}

impl RatingSnapshot {
  /// A snapshot with every category empty.
  pub fn empty(fide_id: u32, period: Period) -> Self {
    Self {
      fide_id,
      period,
      standard: CategoryRating::default(),
      rapid: CategoryRating::default(),
      blitz: CategoryRating::default(),
    }
  }

  pub fn get(&self, category: Category) -> &CategoryRating {
    match category {
      Category::Standard => &self.standard,
      Category::Rapid => &self.rapid,
      Category::Blitz => &self.blitz,
    }
  }

  fn get_mut(&mut self, category: Category) -> &mut CategoryRating {
    match category {
      Category::Standard => &mut self.standard,
      Category::Rapid => &mut self.rapid,
      Category::Blitz => &mut self.blitz,
    }
  }

  pub fn rating(&self, category: Category) -> Option<i32> {
    self.get(category).rating
  }

  /// Number of categories with a rating.
  pub fn populated(&self) -> usize {
    Category::ALL
      .iter()
      .filter(|c| self.rating(**c).is_some())
      .count()
  }

  /// Merge one category's values into the snapshot.
  ///
  /// Only the entry's own category is touched. A missing value never
  /// replaces a stored one: an entry without a rating is ignored entirely and
  /// a missing games count keeps the stored count. Returns whether anything
  /// changed.
  pub fn apply(&mut self, entry: &CategoryEntry) -> bool {
    if entry.is_empty() {
      return false;
    }
    let slot = self.get_mut(entry.category);
    let merged = CategoryRating {
      rating: entry.rating.or(slot.rating),
      games:  entry.games.or(slot.games),
    };
    let changed = merged != *slot;
    *slot = merged;
    changed
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn period() -> Period { "20250801".parse().unwrap() }

  #[test]
  fn apply_only_touches_its_category() {
    let mut snap = RatingSnapshot::empty(1503014, period());
    snap.apply(&CategoryEntry::new(Category::Blitz, Some(2887), Some(10)));
    snap.apply(&CategoryEntry::new(Category::Standard, Some(2839), Some(5)));

    assert_eq!(snap.rating(Category::Standard), Some(2839));
    assert_eq!(snap.rating(Category::Blitz), Some(2887));
    assert_eq!(snap.blitz.games, Some(10));
    assert_eq!(snap.rapid, CategoryRating::default());
  }

  #[test]
  fn missing_rating_never_overwrites() {
    let mut snap = RatingSnapshot::empty(1, period());
    snap.apply(&CategoryEntry::new(Category::Rapid, Some(2100), Some(7)));

    let changed = snap.apply(&CategoryEntry::new(Category::Rapid, None, Some(0)));
    assert!(!changed);
    assert_eq!(snap.rapid, CategoryRating { rating: Some(2100), games: Some(7) });
  }

  #[test]
  fn missing_games_keeps_stored_count() {
    let mut snap = RatingSnapshot::empty(1, period());
    snap.apply(&CategoryEntry::new(Category::Standard, Some(2000), Some(9)));
    snap.apply(&CategoryEntry::new(Category::Standard, Some(2010), None));
    assert_eq!(snap.standard, CategoryRating { rating: Some(2010), games: Some(9) });
  }

  #[test]
  fn reapplying_same_entry_is_a_no_op() {
    let mut snap = RatingSnapshot::empty(1, period());
    let entry = CategoryEntry::new(Category::Standard, Some(2000), Some(0));
    assert!(snap.apply(&entry));
    assert!(!snap.apply(&entry));
  }

  #[test]
  fn populated_counts_rated_categories() {
    let mut snap = RatingSnapshot::empty(1, period());
    assert_eq!(snap.populated(), 0);
    snap.apply(&CategoryEntry::new(Category::Rapid, Some(1500), None));
    assert_eq!(snap.populated(), 1);
  }
}
