//! Datastore access.
//!
//! Collection steps only see [`MetricSource`]: a read-only query in, rows out.
//! A source distinguishes "could not reach the datastore"
//! (`StrataError::Connection`) from "reached it but the query failed"
//! (`StrataError::Query`) so the collector can maintain the connection
//! health gauge.

pub mod postgres;

use async_trait::async_trait;

use strata_core::error::Result;
use strata_core::Row;

pub use postgres::PgSource;

#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Run one read-only query and return every row.
    ///
    /// `order_by` (e.g. `timestamp DESC`) orders the returned rows by columns
    /// of `sql`'s result; without it row order is unspecified.
    async fn fetch(&self, sql: &str, order_by: Option<&str>) -> Result<Vec<Row>>;
}
