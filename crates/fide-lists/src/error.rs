//! Error types for the rating-list parsers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The document is not well-formed XML. Individual bad `player` elements
  /// never produce this; they are counted as malformed and skipped.
  #[error("xml error at byte {position}: {message}")]
  Xml { position: u64, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
