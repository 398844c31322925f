//! Exporter config loader (environment only).

pub mod schema;

use strata_core::error::Result;

pub use schema::{DatabaseConfig, ExporterConfig, ExporterSection};

/// Load and validate config from the process environment.
pub fn load_from_env() -> Result<ExporterConfig> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// Load and validate config from an arbitrary key lookup.
pub fn load_from_lookup<F>(lookup: F) -> Result<ExporterConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let cfg = ExporterConfig::from_lookup(&lookup)?;
    cfg.validate()?;
    Ok(cfg)
}
