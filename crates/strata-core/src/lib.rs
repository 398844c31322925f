//! strata core: datastore-agnostic primitives shared by the exporter.
//!
//! This crate defines the error surface, the query-result row model and the
//! row-to-label mapping rules. It carries no runtime, HTTP or database driver
//! dependencies so the mapping rules can be tested in isolation.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed rows never fail: missing labels fall back to fixed defaults and
//! unparseable values become `0.0`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod row;
pub mod window;

/// Shared result type.
pub use error::{ErrorKind, Result, StrataError};
pub use row::{map_rows, LabelField, Row, Sample};
pub use window::TimeWindow;
