//! Rating categories. FIDE rates each discipline independently.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// One of the three rating disciplines. Each is published as its own list and
/// stored in its own pair of columns on a rating snapshot.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
  Standard,
  Rapid,
  Blitz,
}

impl Category {
  pub const ALL: [Category; 3] =
    [Category::Standard, Category::Rapid, Category::Blitz];

  /// The lowercase name used in file names and database columns.
  pub fn as_str(self) -> &'static str { self.into() }
}
