//! Month-over-month rating changes derived from a player's snapshot series.

use std::collections::{BTreeMap, btree_map::Entry};

use serde::{Deserialize, Serialize};

use crate::{Category, Period, snapshot::RatingSnapshot};

/// A category's rating in one period and its change since the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryChange {
  pub rating: Option<i32>,
  /// `None` when there is no previous period in the window or either rating
  /// is missing. `Some(0)` means the rating did not move.
  pub change: Option<i32>,
}

impl CategoryChange {
  fn between(
    prev: Option<&RatingSnapshot>,
    current: &RatingSnapshot,
    category: Category,
  ) -> Self {
    let rating = current.rating(category);
    let change = match (prev.and_then(|p| p.rating(category)), rating) {
      (Some(before), Some(after)) => Some(after - before),
      _ => None,
    };
    Self { rating, change }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChange {
  pub period:   Period,
  pub standard: CategoryChange,
  pub rapid:    CategoryChange,
  pub blitz:    CategoryChange,
}

impl RatingChange {
  pub fn get(&self, category: Category) -> &CategoryChange {
    match category {
      Category::Standard => &self.standard,
      Category::Rapid => &self.rapid,
      Category::Blitz => &self.blitz,
    }
  }
}

/// Compute rating changes over the most recent `window` periods of `history`.
///
/// The input may be in any order and may contain several rows for the same
/// month; only one per month is kept (the one with the most rated
/// categories, later rows winning ties). Deltas are taken against the
/// chronologically preceding period inside the window, so the earliest
/// period always has no change. The result is ordered newest first.
pub fn derive_changes<I>(history: I, window: usize) -> Vec<RatingChange>
where
  I: IntoIterator<Item = RatingSnapshot>,
{
  let mut by_period: BTreeMap<Period, RatingSnapshot> = BTreeMap::new();
  for snap in history {
    match by_period.entry(snap.period) {
      Entry::Vacant(slot) => {
        slot.insert(snap);
      }
      Entry::Occupied(mut slot) => {
        if snap.populated() >= slot.get().populated() {
          slot.insert(snap);
        }
      }
    }
  }

  let series: Vec<RatingSnapshot> = by_period.into_values().collect();
  let series = &series[series.len().saturating_sub(window)..];

  let mut changes = Vec::with_capacity(series.len());
  let mut prev: Option<&RatingSnapshot> = None;
  for snap in series {
    changes.push(RatingChange {
      period:   snap.period,
      standard: CategoryChange::between(prev, snap, Category::Standard),
      rapid:    CategoryChange::between(prev, snap, Category::Rapid),
      blitz:    CategoryChange::between(prev, snap, Category::Blitz),
    });
    prev = Some(snap);
  }

  changes.reverse();
  changes
}
