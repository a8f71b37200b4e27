//! Core types and trait definitions for the FIDE rating-list pipeline.
//!
//! This crate is deliberately free of HTTP, archive and database
//! dependencies. The parsers, the storage backends and the importer all
//! depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod category;
pub mod changes;
pub mod error;
pub mod period;
pub mod player;
pub mod record;
pub mod run;
pub mod snapshot;
pub mod store;

pub use category::Category;
pub use error::{Error, Result};
pub use period::Period;
