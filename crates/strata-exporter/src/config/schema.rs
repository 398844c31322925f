use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use strata_core::error::{Result, StrataError};

pub const ENV_DB_HOST: &str = "SUPABASE_HOST";
pub const ENV_DB_PORT: &str = "SUPABASE_PORT";
pub const ENV_DB_NAME: &str = "SUPABASE_DB";
pub const ENV_DB_USER: &str = "SUPABASE_USER";
pub const ENV_DB_PASSWORD: &str = "SUPABASE_PASSWORD";
pub const ENV_METRICS_PORT: &str = "METRICS_PORT";
pub const ENV_METRICS_BIND: &str = "METRICS_BIND";
pub const ENV_COLLECTION_INTERVAL: &str = "COLLECTION_INTERVAL";
pub const ENV_COST_AGGREGATE: &str = "COLLECT_API_COST_AGGREGATE";

#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub database: DatabaseConfig,
    pub exporter: ExporterSection,
}

impl ExporterConfig {
    pub(crate) fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database = DatabaseConfig {
            host: get(ENV_DB_HOST).unwrap_or_else(default_db_host),
            port: parse_or(ENV_DB_PORT, get(ENV_DB_PORT), default_db_port())?,
            database: get(ENV_DB_NAME).unwrap_or_else(default_db_name),
            user: get(ENV_DB_USER).unwrap_or_else(default_db_user),
            // passwords may legitimately contain surrounding whitespace
            password: lookup(ENV_DB_PASSWORD).unwrap_or_default(),
        };

        let exporter = ExporterSection {
            bind: get(ENV_METRICS_BIND).unwrap_or_else(default_bind),
            port: parse_or(ENV_METRICS_PORT, get(ENV_METRICS_PORT), default_metrics_port())?,
            collection_interval_secs: parse_or(
                ENV_COLLECTION_INTERVAL,
                get(ENV_COLLECTION_INTERVAL),
                default_collection_interval_secs(),
            )?,
            collect_cost_aggregate: match get(ENV_COST_AGGREGATE) {
                Some(v) => parse_bool(ENV_COST_AGGREGATE, &v)?,
                None => false,
            },
        };

        Ok(Self { database, exporter })
    }

    pub fn validate(&self) -> Result<()> {
        self.database.validate()?;
        self.exporter.validate()?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(StrataError::Config(format!("{ENV_DB_PORT} must be non-zero")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ExporterSection {
    pub bind: String,
    pub port: u16,
    pub collection_interval_secs: u64,
    /// Also publish `api_cost_daily_usd` by provider and model.
    pub collect_cost_aggregate: bool,
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(StrataError::Config(format!("{ENV_METRICS_PORT} must be non-zero")));
        }
        if !(1..=86_400).contains(&self.collection_interval_secs) {
            return Err(StrataError::Config(format!(
                "{ENV_COLLECTION_INTERVAL} must be between 1 and 86400 seconds"
            )));
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let host = if self.bind.contains(':') && !self.bind.starts_with('[') {
            format!("[{}]", self.bind)
        } else {
            self.bind.clone()
        };
        format!("{host}:{}", self.port)
            .parse()
            .map_err(|e| StrataError::Config(format!("{ENV_METRICS_BIND} is not a valid address: {e}")))
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(v) => v
            .parse()
            .map_err(|e| StrataError::Config(format!("{key}={v:?} is invalid: {e}"))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, v: &str) -> Result<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(StrataError::Config(format!("{key}={v:?} is not a boolean"))),
    }
}

fn default_db_host() -> String {
    "localhost".into()
}
fn default_db_port() -> u16 {
    5432
}
fn default_db_name() -> String {
    "postgres".into()
}
fn default_db_user() -> String {
    "postgres".into()
}
fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_metrics_port() -> u16 {
    8080
}
fn default_collection_interval_secs() -> u64 {
    60
}
