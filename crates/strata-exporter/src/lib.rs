//! strata exporter library entry.
//!
//! Wires the env config, the datastore source, the collector loop and the
//! scrape endpoint together. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod collector;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
pub mod source;

/// Static labels for `metrics_exporter_info`.
pub const EXPORTER_INFO: &[(&str, &str)] = &[
    ("version", env!("CARGO_PKG_VERSION")),
    ("description", "Strata automation metrics exporter"),
];
