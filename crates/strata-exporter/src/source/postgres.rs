//! Postgres-backed [`MetricSource`].
//!
//! Every `fetch` opens a fresh connection and closes it before returning,
//! whether the query succeeded or not. No pool is kept between cycles.
//! Rows are converted to JSON objects server-side (`to_jsonb`) so the
//! mapping layer never depends on per-column Rust types.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

use strata_core::error::{Result, StrataError};
use strata_core::Row;

use crate::config::DatabaseConfig;
use crate::source::MetricSource;

pub struct PgSource {
    options: PgConnectOptions,
}

impl PgSource {
    pub fn new(cfg: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .database(&cfg.database)
            .username(&cfg.user)
            .password(&cfg.password)
            .application_name("strata-exporter");
        Self { options }
    }
}

/// Wrap a query so each result row arrives as one `jsonb` object.
///
/// A subquery's `ORDER BY` does not bind the outer select, so any ordering
/// the caller relies on is repeated on the outer query.
pub fn wrap_as_json(sql: &str, order_by: Option<&str>) -> String {
    let inner = sql.trim().trim_end_matches(';');
    match order_by {
        Some(order) => format!("SELECT to_jsonb(q) AS row FROM ({inner}) AS q ORDER BY {order}"),
        None => format!("SELECT to_jsonb(q) AS row FROM ({inner}) AS q"),
    }
}

#[async_trait]
impl MetricSource for PgSource {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch(&self, sql: &str, order_by: Option<&str>) -> Result<Vec<Row>> {
        let mut conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| StrataError::Connection(e.to_string()))?;

        let result = sqlx::query_scalar::<_, serde_json::Value>(&wrap_as_json(sql, order_by))
            .fetch_all(&mut conn)
            .await;

        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "closing datastore connection failed");
        }

        let values = result.map_err(|e| StrataError::Query(e.to_string()))?;
        Ok(values.into_iter().map(Row::from).collect())
    }
}
