//! Top-level facade crate for strata.
//!
//! Re-exports core types and the exporter library so users can depend on a single crate.

pub mod core {
    pub use strata_core::*;
}

pub mod exporter {
    pub use strata_exporter::*;
}
