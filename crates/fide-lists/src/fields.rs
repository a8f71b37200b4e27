//! Field-level normalisation shared by both list formats.
//!
//! Blank becomes `None`; numeric fields that do not parse become `None`.

pub(crate) fn text(raw: &str) -> Option<String> {
  let t = raw.trim();
  (!t.is_empty()).then(|| t.to_string())
}

pub(crate) fn int(raw: &str) -> Option<i32> { raw.trim().parse().ok() }

/// FIDE writes `0` for an unknown birth year.
pub(crate) fn year(raw: &str) -> Option<i32> { int(raw).filter(|y| *y > 0) }

pub(crate) fn fide_id(raw: &str) -> Option<u32> {
  raw.trim().parse::<u32>().ok().filter(|id| *id != 0)
}
