//! Fixed-width text rating lists (pre-2020).
//!
//! Each data line is sliced at fixed byte offsets:
//!
//! | field      | bytes     |
//! |------------|-----------|
//! | ID number  | 0..15     |
//! | Name       | 15..76    |
//! | Federation | 76..80    |
//! | Sex        | 80..83    |
//! | Title      | 83..88    |
//! | Rating     | 113..118  |
//! | Games      | 118..123  |
//! | Birth year | 127..132  |
//! | Flag       | 132..136  |
//!
//! Older files are Latin-1, so slicing works on bytes. A field that is not
//! valid UTF-8 is decoded as Windows-1252, the superset of Latin-1 that
//! FIDE's files use in practice.

use std::{borrow::Cow, ops::Range};

use encoding_rs::WINDOWS_1252;
use fide_core::record::RatingRecord;

use crate::{ParsedList, fields};

const ID: Range<usize> = 0..15;
const NAME: Range<usize> = 15..76;
const FEDERATION: Range<usize> = 76..80;
const SEX: Range<usize> = 80..83;
const TITLE: Range<usize> = 83..88;
const RATING: Range<usize> = 113..118;
const GAMES: Range<usize> = 118..123;
const BIRTH_YEAR: Range<usize> = 127..132;
const FLAG: Range<usize> = 132..136;

/// Why a line produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
  Blank,
  /// The column header line (`ID Number  Name ...`).
  Header,
  /// The ID field is not a non-zero integer; carries the raw field.
  InvalidId(String),
}

/// The result of reading one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
  Record(RatingRecord),
  Skip(SkipReason),
}

/// Slice `range` out of `line`, clamped to the line length.
fn field(line: &[u8], range: Range<usize>) -> Cow<'_, str> {
  let end = range.end.min(line.len());
  if range.start >= end {
    return Cow::Borrowed("");
  }
  let bytes = &line[range.start..end];
  match std::str::from_utf8(bytes) {
    Ok(s) => Cow::Borrowed(s),
    Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0,
  }
}

fn is_header(line: &[u8]) -> bool {
  let trimmed = line.trim_ascii_start();
  trimmed.len() >= 2 && trimmed[..2].eq_ignore_ascii_case(b"ID")
}

/// Read one line of a fixed-width list. Never fails: anything unreadable
/// comes back as [`LineOutcome::Skip`].
pub fn parse_fixed_width_line(line: &[u8]) -> LineOutcome {
  let line = line.strip_suffix(b"\r").unwrap_or(line);
  if line.trim_ascii().is_empty() {
    return LineOutcome::Skip(SkipReason::Blank);
  }

  let raw_id = field(line, ID);
  let Some(fide_id) = fields::fide_id(&raw_id) else {
    if is_header(line) {
      return LineOutcome::Skip(SkipReason::Header);
    }
    return LineOutcome::Skip(SkipReason::InvalidId(raw_id.trim().to_string()));
  };

  LineOutcome::Record(RatingRecord {
    fide_id,
    name: fields::text(&field(line, NAME)),
    title: fields::text(&field(line, TITLE)),
    federation: fields::text(&field(line, FEDERATION)),
    sex: fields::text(&field(line, SEX)),
    birth_year: fields::year(&field(line, BIRTH_YEAR)),
    flag: fields::text(&field(line, FLAG)),
    rating: fields::int(&field(line, RATING)),
    games: fields::int(&field(line, GAMES)),
  })
}

/// Parse a whole fixed-width list.
pub fn parse_fixed_width(input: &[u8]) -> ParsedList {
  let mut list = ParsedList::default();

  for (index, line) in input.split(|b| *b == b'\n').enumerate() {
    match parse_fixed_width_line(line) {
      LineOutcome::Record(record) => list.records.push(record),
      LineOutcome::Skip(SkipReason::InvalidId(raw)) => {
        list.push_malformed(format!("line {}: invalid id {raw:?}", index + 1));
      }
      LineOutcome::Skip(SkipReason::Blank | SkipReason::Header) => {}
    }
  }

  list
}
