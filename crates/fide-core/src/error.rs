//! Error types for `fide-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid period {0:?}: expected YYYYMMDD, YYYY-MM or YYYY-MM-DD")]
  InvalidPeriod(String),

  #[error("period out of range: {year}-{month:02}")]
  PeriodOutOfRange { year: i32, month: u32 },

  #[error("unknown rating category: {0:?}")]
  UnknownCategory(String),

  #[error("unknown import status: {0:?}")]
  UnknownStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
