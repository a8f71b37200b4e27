//! Rating periods: the calendar month a rating list was published for.
//!
//! FIDE publishes one list per category per month. A period is stored and
//! displayed as an 8-digit `YYYYMMDD` string with the day fixed to `01`, so
//! the zero-padded text form sorts in the same order as the months do.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const MONTH_ABBREVS: [&str; 12] = [
  "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov",
  "dec",
];

/// A year-month identifier. Ordering is chronological.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
  // Field order matters: the derived `Ord` compares year first.
  year:  i32,
  month: u32,
}

impl Period {
  pub fn new(year: i32, month: u32) -> Result<Self> {
    if !(1000..=9999).contains(&year) || !(1..=12).contains(&month) {
      return Err(Error::PeriodOutOfRange { year, month });
    }
    Ok(Self { year, month })
  }

  /// The period containing `date`.
  pub fn from_date(date: NaiveDate) -> Self {
    Self { year: date.year(), month: date.month() }
  }

  /// The period containing today's date (UTC).
  pub fn current() -> Self { Self::from_date(Utc::now().date_naive()) }

  pub fn year(&self) -> i32 { self.year }

  pub fn month(&self) -> u32 { self.month }

  /// First day of the month.
  pub fn first_day(&self) -> NaiveDate {
    // Always valid: month is 1..=12 and the year is four digits.
    NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
  }

  /// Lowercase three-letter month name used in FIDE file names (`"aug"`).
  pub fn month_abbrev(&self) -> &'static str {
    MONTH_ABBREVS[(self.month - 1) as usize]
  }

  /// Two-digit year used in FIDE file names (`2025` → `"25"`).
  pub fn short_year(&self) -> String { format!("{:02}", self.year % 100) }

  pub fn next(&self) -> Self {
    if self.month == 12 {
      Self { year: self.year + 1, month: 1 }
    } else {
      Self { year: self.year, month: self.month + 1 }
    }
  }

  pub fn prev(&self) -> Self {
    if self.month == 1 {
      Self { year: self.year - 1, month: 12 }
    } else {
      Self { year: self.year, month: self.month - 1 }
    }
  }

  /// The period `months` months before this one.
  pub fn months_back(&self, months: u32) -> Self {
    let index = self.year * 12 + self.month as i32 - 1 - months as i32;
    Self { year: index.div_euclid(12), month: index.rem_euclid(12) as u32 + 1 }
  }

  /// Every period from `start` through `end`, inclusive. Empty when
  /// `start > end`.
  pub fn range(start: Period, end: Period) -> impl Iterator<Item = Period> {
    std::iter::successors(Some(start), |p| Some(p.next()))
      .take_while(move |p| *p <= end)
  }
}

impl fmt::Display for Period {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:04}{:02}01", self.year, self.month)
  }
}

impl FromStr for Period {
  type Err = Error;

  /// Accepts `YYYYMMDD`, `YYYY-MM-DD` and `YYYY-MM`. Any valid day is
  /// normalised to the first of its month.
  fn from_str(s: &str) -> Result<Self> {
    let s = s.trim();
    let invalid = || Error::InvalidPeriod(s.to_string());

    let date = if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
      NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| invalid())?
    } else if s.len() == 10 {
      NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())?
    } else if s.len() == 7 {
      NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .map_err(|_| invalid())?
    } else {
      return Err(invalid());
    };

    Self::new(date.year(), date.month())
  }
}

impl TryFrom<String> for Period {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

impl From<Period> for String {
  fn from(p: Period) -> Self { p.to_string() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn displays_as_first_of_month() {
    let p = Period::new(2025, 8).unwrap();
    assert_eq!(p.to_string(), "20250801");
  }

  #[test]
  fn parses_all_accepted_forms() {
    let expected = Period::new(2025, 8).unwrap();
    assert_eq!("20250801".parse::<Period>().unwrap(), expected);
    assert_eq!("2025-08".parse::<Period>().unwrap(), expected);
    assert_eq!("2025-08-01".parse::<Period>().unwrap(), expected);
  }

  #[test]
  fn mid_month_day_is_normalised() {
    let p: Period = "20250815".parse().unwrap();
    assert_eq!(p.to_string(), "20250801");
  }

  #[test]
  fn rejects_garbage() {
    assert!("2025081".parse::<Period>().is_err());
    assert!("20251301".parse::<Period>().is_err());
    assert!("august".parse::<Period>().is_err());
    assert!("".parse::<Period>().is_err());
  }

  #[test]
  fn ordering_matches_text_ordering() {
    let a = Period::new(2019, 12).unwrap();
    let b = Period::new(2020, 1).unwrap();
    let c = Period::new(2020, 10).unwrap();
    assert!(a < b && b < c);
    assert!(a.to_string() < b.to_string());
    assert!(b.to_string() < c.to_string());
  }

  #[test]
  fn next_and_prev_wrap_years() {
    let dec = Period::new(2024, 12).unwrap();
    assert_eq!(dec.next(), Period::new(2025, 1).unwrap());
    assert_eq!(dec.next().prev(), dec);
  }

  #[test]
  fn months_back_crosses_years() {
    let p = Period::new(2025, 8).unwrap();
    assert_eq!(p.months_back(24), Period::new(2023, 8).unwrap());
    assert_eq!(p.months_back(8), Period::new(2024, 12).unwrap());
    assert_eq!(p.months_back(0), p);
  }

  #[test]
  fn range_is_inclusive() {
    let start = Period::new(2015, 11).unwrap();
    let end = Period::new(2016, 2).unwrap();
    let all: Vec<String> =
      Period::range(start, end).map(|p| p.to_string()).collect();
    assert_eq!(all, ["20151101", "20151201", "20160101", "20160201"]);
    assert_eq!(Period::range(end, start).count(), 0);
  }

  #[test]
  fn file_name_parts() {
    let p = Period::new(2009, 3).unwrap();
    assert_eq!(p.month_abbrev(), "mar");
    assert_eq!(p.short_year(), "09");
  }

  #[test]
  fn serde_uses_text_form() {
    let p = Period::new(2025, 8).unwrap();
    let json = serde_json::to_string(&p).unwrap();
    assert_eq!(json, "\"20250801\"");
    let back: Period = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);
  }
}
