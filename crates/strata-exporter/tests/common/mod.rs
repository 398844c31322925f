//! Scripted in-memory `MetricSource` shared by collector and HTTP tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use strata_core::error::{Result, StrataError};
use strata_core::Row;
use strata_exporter::collector::{Collector, CollectorOptions};
use strata_exporter::obs::ExporterMetrics;
use strata_exporter::source::MetricSource;

#[derive(Clone)]
pub enum Reply {
    Rows(Vec<Value>),
    ConnectionRefused,
    BadQuery,
}

struct Rule {
    needles: Vec<String>,
    reply: Reply,
}

/// Answers a query with the first rule whose needles all occur in the SQL.
/// Unmatched queries return no rows.
#[derive(Default)]
pub struct FakeSource {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
    down: AtomicBool,
    panics_left: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, needles: &[&str], reply: Reply) {
        self.rules.lock().unwrap().push(Rule {
            needles: needles.iter().map(|s| s.to_string()).collect(),
            reply,
        });
    }

    pub fn clear(&self) {
        self.rules.lock().unwrap().clear();
    }

    /// Every query fails to connect while set.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Panic on the next `n` fetches.
    pub fn panic_next(&self, n: usize) {
        self.panics_left.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(sql, _)| sql.clone()).collect()
    }

    /// Ordering requested for the first query containing `needle`.
    pub fn order_for(&self, needle: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(sql, _)| sql.contains(needle))
            .and_then(|(_, order)| order.clone())
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }
}

#[async_trait]
impl MetricSource for FakeSource {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch(&self, sql: &str, order_by: Option<&str>) -> Result<Vec<Row>> {
        let left = self.panics_left.load(Ordering::SeqCst);
        if left > 0 {
            self.panics_left.store(left - 1, Ordering::SeqCst);
            panic!("scripted source panic");
        }

        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), order_by.map(str::to_string)));

        if self.down.load(Ordering::SeqCst) {
            return Err(StrataError::Connection("connection refused".into()));
        }

        let reply = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.needles.iter().all(|n| sql.contains(n.as_str())))
            .map(|r| r.reply.clone());

        match reply {
            Some(Reply::Rows(rows)) => Ok(rows.into_iter().map(Row::from).collect()),
            Some(Reply::ConnectionRefused) => Err(StrataError::Connection("connection refused".into())),
            Some(Reply::BadQuery) => Err(StrataError::Query("column \"nope\" does not exist".into())),
            None => Ok(vec![]),
        }
    }
}

pub fn collector(source: Arc<FakeSource>, options: CollectorOptions) -> (Arc<ExporterMetrics>, Arc<Collector>) {
    let metrics = Arc::new(ExporterMetrics::new());
    let collector = Arc::new(Collector::new(source, Arc::clone(&metrics), options));
    (metrics, collector)
}

// Needles identifying each query.
pub const TICKETS_HOURLY: &[&str] = &["'ticket_processed'", "INTERVAL '1 hour'"];
pub const TICKETS_DAILY: &[&str] = &["'ticket_processed'", "INTERVAL '24 hours'"];
pub const RATE_LIMITS: &[&str] = &["subcategory = 'rate_limit'"];
pub const AUTOMATION: &[&str] = &["'automation_rate'"];
pub const SIMILARITY: &[&str] = &["'similarity_score'"];
pub const CSAT: &[&str] = &["'csat_score'"];
pub const RESOLUTION: &[&str] = &["'resolution_time'"];
pub const COST_PER_TICKET: &[&str] = &["'api_cost_per_ticket'"];
pub const COST_AGGREGATE: &[&str] = &["metric_name = 'api_cost' "];
