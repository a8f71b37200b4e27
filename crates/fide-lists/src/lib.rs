//! FIDE rating-list parsers.
//!
//! Decodes one single-category rating list into normalised
//! [`RatingRecord`]s. Two layouts exist:
//!
//! - fixed-width text (`*frl.txt`), published before 2020;
//! - `playerslist` XML (`*frl_xml.xml`), published from 2020.
//!
//! Pure synchronous; no HTTP, archive or database dependencies. A malformed
//! line or element is counted and skipped, never fatal.
//!
//! # Quick start
//!
//! ```no_run
//! use fide_lists::{ListFormat, parse};
//!
//! let bytes = std::fs::read("standard_aug25frl_xml.xml").unwrap();
//! let list = parse(&bytes, ListFormat::Xml).unwrap();
//! println!("{} players, {} malformed", list.records.len(), list.malformed);
//! ```

pub mod error;
mod fields;
pub mod fixed_width;
pub mod xml;

use std::path::Path;

pub use error::{Error, Result};
use fide_core::{Period, record::RatingRecord};
pub use fixed_width::{LineOutcome, SkipReason, parse_fixed_width, parse_fixed_width_line};
pub use xml::parse_xml;

/// How many malformed entries are kept verbatim for the log.
const MAX_SAMPLES: usize = 5;

// ─── Public types ────────────────────────────────────────────────────────────

/// The on-disk layout of a rating list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
  FixedWidth,
  Xml,
}

impl ListFormat {
  /// Pick the format from a data file's extension. Anything that is not
  /// `.xml` is treated as fixed-width text.
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some(ext) if ext.eq_ignore_ascii_case("xml") => Self::Xml,
      _ => Self::FixedWidth,
    }
  }

  /// The format FIDE used for lists of `period`.
  pub fn for_period(period: Period) -> Self {
    if period.year() >= 2020 { Self::Xml } else { Self::FixedWidth }
  }
}

/// The result of parsing one rating list.
#[derive(Debug, Clone, Default)]
pub struct ParsedList {
  /// Records in file order.
  pub records:   Vec<RatingRecord>,
  /// Lines or elements dropped because they could not be read.
  pub malformed: usize,
  /// The first few malformed entries, for diagnostics.
  pub samples:   Vec<String>,
}

impl ParsedList {
  pub(crate) fn push_malformed(&mut self, description: String) {
    self.malformed += 1;
    if self.samples.len() < MAX_SAMPLES {
      self.samples.push(description);
    }
  }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Parse a whole rating list in the given format.
///
/// Only a structurally broken XML document returns `Err`; fixed-width input
/// always parses.
pub fn parse(input: &[u8], format: ListFormat) -> Result<ParsedList> {
  let list = match format {
    ListFormat::FixedWidth => parse_fixed_width(input),
    ListFormat::Xml => parse_xml(input)?,
  };

  if list.malformed > 0 {
    tracing::warn!(
      malformed = list.malformed,
      samples = ?list.samples,
      "dropped malformed rating-list entries"
    );
  }

  Ok(list)
}
