//! The fixed set of collection steps and their queries.
//!
//! Each step reads `system_metrics` over a fixed trailing window and writes
//! gauges. Steps never clear label sets missing from the latest result, so
//! an empty result leaves previous values in place.

use strata_core::error::Result;
use strata_core::{map_rows, LabelField, Row, Sample, TimeWindow};

use crate::collector::Collector;
use crate::obs::GaugeVec;

pub const PROVIDER: LabelField = LabelField::new("provider", "unknown");
pub const MODEL: LabelField = LabelField::new("model", "unknown");
pub const LIMIT_TYPE: LabelField = LabelField::new("limit_type", "requests");
pub const CATEGORY: LabelField = LabelField::new("category", "unknown");
pub const TICKET_CATEGORY: LabelField = LabelField::new("category", "uncategorized");
pub const SUBCATEGORY: LabelField = LabelField::new("subcategory", "all");
pub const AUTOMATION_LEVEL: LabelField = LabelField::new("automation_level", "manual");

/// Step identifiers, also used as the `metric_type` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    ApiRateLimits,
    TicketsProcessed,
    AutomationRate,
    SimilarityScores,
    CsatScores,
    ResolutionTime,
    ApiCosts,
}

impl StepId {
    /// Execution order within one cycle.
    pub const ALL: [StepId; 7] = [
        StepId::ApiRateLimits,
        StepId::TicketsProcessed,
        StepId::AutomationRate,
        StepId::SimilarityScores,
        StepId::CsatScores,
        StepId::ResolutionTime,
        StepId::ApiCosts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepId::ApiRateLimits => "api_rate_limits",
            StepId::TicketsProcessed => "tickets_processed",
            StepId::AutomationRate => "automation_rate",
            StepId::SimilarityScores => "similarity_scores",
            StepId::CsatScores => "csat_scores",
            StepId::ResolutionTime => "resolution_time",
            StepId::ApiCosts => "api_costs",
        }
    }
}

/// One read query whose rows map directly onto a gauge.
#[derive(Debug, Clone)]
pub struct GaugeQuery {
    pub sql: String,
    pub labels: &'static [LabelField],
    pub value_column: &'static str,
    /// Rows arrive newest first; the newest row per label set must win.
    pub newest_first: bool,
}

/// Outer ordering for queries whose rows must arrive newest first.
pub const NEWEST_FIRST: &str = "timestamp DESC";

impl GaugeQuery {
    fn grouped(sql: String, labels: &'static [LabelField], value_column: &'static str) -> Self {
        Self { sql, labels, value_column, newest_first: false }
    }

    /// Ordering the source must apply to the returned rows.
    pub fn order_by(&self) -> Option<&'static str> {
        self.newest_first.then_some(NEWEST_FIRST)
    }
}

/// Average of `metric_name` over `window`, grouped by metadata fields.
fn metadata_avg(metric_name: &str, window: TimeWindow, group_by: &[&str], alias: &str) -> String {
    let cols: Vec<String> = group_by
        .iter()
        .map(|f| format!("metadata->>'{f}' AS {f}"))
        .collect();
    let groups: Vec<String> = group_by.iter().map(|f| format!("metadata->>'{f}'")).collect();
    format!(
        "SELECT {cols}, AVG(metric_value) AS {alias} \
         FROM system_metrics \
         WHERE metric_name = '{metric_name}' AND {window} \
         GROUP BY {groups}",
        cols = cols.join(", "),
        window = window.predicate(),
        groups = groups.join(", "),
    )
}

pub fn rate_limit_query() -> GaugeQuery {
    GaugeQuery {
        sql: format!(
            "SELECT metadata->>'provider' AS provider, \
                    metadata->>'limit_type' AS limit_type, \
                    metadata->>'limit' AS limit_total, \
                    metric_value, timestamp \
             FROM system_metrics \
             WHERE category = 'api' AND subcategory = 'rate_limit' AND {} \
             ORDER BY timestamp DESC",
            TimeWindow::FiveMinutes.predicate()
        ),
        labels: &[PROVIDER, LIMIT_TYPE],
        value_column: "metric_value",
        newest_first: true,
    }
}

pub fn tickets_query(window: TimeWindow) -> GaugeQuery {
    GaugeQuery::grouped(
        format!(
            "SELECT metadata->>'category' AS category, COUNT(*) AS count \
             FROM system_metrics \
             WHERE metric_name = 'ticket_processed' AND {} \
             GROUP BY metadata->>'category'",
            window.predicate()
        ),
        &[TICKET_CATEGORY],
        "count",
    )
}

pub fn automation_rate_query() -> GaugeQuery {
    GaugeQuery {
        sql: format!(
            "SELECT metric_name, metric_value, category, subcategory, timestamp \
             FROM system_metrics \
             WHERE metric_name = 'automation_rate' AND {} \
             ORDER BY timestamp DESC \
             LIMIT 100",
            TimeWindow::FiveMinutes.predicate()
        ),
        labels: &[CATEGORY, SUBCATEGORY],
        value_column: "metric_value",
        newest_first: true,
    }
}

pub fn similarity_query() -> GaugeQuery {
    GaugeQuery::grouped(
        metadata_avg("similarity_score", TimeWindow::OneHour, &["category"], "avg_score"),
        &[CATEGORY],
        "avg_score",
    )
}

pub fn csat_query() -> GaugeQuery {
    GaugeQuery::grouped(
        metadata_avg(
            "csat_score",
            TimeWindow::TwentyFourHours,
            &["category", "automation_level"],
            "avg_csat",
        ),
        &[CATEGORY, AUTOMATION_LEVEL],
        "avg_csat",
    )
}

pub fn resolution_time_query() -> GaugeQuery {
    GaugeQuery::grouped(
        metadata_avg(
            "resolution_time",
            TimeWindow::TwentyFourHours,
            &["category", "automation_level"],
            "avg_resolution_time",
        ),
        &[CATEGORY, AUTOMATION_LEVEL],
        "avg_resolution_time",
    )
}

pub fn cost_per_ticket_query() -> GaugeQuery {
    GaugeQuery::grouped(
        metadata_avg(
            "api_cost_per_ticket",
            TimeWindow::TwentyFourHours,
            &["category", "automation_level"],
            "avg_cost",
        ),
        &[CATEGORY, AUTOMATION_LEVEL],
        "avg_cost",
    )
}

pub fn cost_aggregate_query() -> GaugeQuery {
    GaugeQuery::grouped(
        format!(
            "SELECT metadata->>'provider' AS provider, metadata->>'model' AS model, \
                    SUM(metric_value) AS total_cost \
             FROM system_metrics \
             WHERE metric_name = 'api_cost' AND {} \
             GROUP BY metadata->>'provider', metadata->>'model'",
            TimeWindow::TwentyFourHours.predicate()
        ),
        &[PROVIDER, MODEL],
        "total_cost",
    )
}

/// Write samples into a gauge, returning how many were written.
pub fn apply_samples(gauge: &GaugeVec, samples: &[Sample], newest_first: bool) -> usize {
    let write = |s: &Sample| gauge.set(&s.label_pairs(), s.value);
    if newest_first {
        samples.iter().rev().for_each(write);
    } else {
        samples.iter().for_each(write);
    }
    samples.len()
}

/// `(limit - remaining) / limit * 100`, or `None` without a usable limit.
pub fn consumed_percent(row: &Row, remaining: f64) -> Option<f64> {
    let limit = row.value("limit_total");
    if limit <= 0.0 {
        return None;
    }
    Some(((limit - remaining) / limit * 100.0).clamp(0.0, 100.0))
}

impl Collector {
    /// Run a step's queries and update its gauges.
    pub(crate) async fn collect(&self, step: StepId) -> Result<usize> {
        let m = self.metrics();
        match step {
            StepId::ApiRateLimits => self.collect_rate_limits().await,
            StepId::TicketsProcessed => {
                let hourly = self
                    .apply_gauge(&m.tickets_processed_hourly, &tickets_query(TimeWindow::OneHour))
                    .await?;
                let daily = self
                    .apply_gauge(&m.tickets_processed_daily, &tickets_query(TimeWindow::TwentyFourHours))
                    .await?;
                tracing::debug!(hourly, daily, "tickets processed");
                Ok(hourly + daily)
            }
            StepId::AutomationRate => self.apply_gauge(&m.automation_rate, &automation_rate_query()).await,
            StepId::SimilarityScores => self.apply_gauge(&m.similarity_score_avg, &similarity_query()).await,
            StepId::CsatScores => self.apply_gauge(&m.csat_score, &csat_query()).await,
            StepId::ResolutionTime => {
                self.apply_gauge(&m.resolution_time_avg, &resolution_time_query()).await
            }
            StepId::ApiCosts => {
                let mut n = self
                    .apply_gauge(&m.api_cost_per_ticket_usd, &cost_per_ticket_query())
                    .await?;
                if self.options().cost_aggregate {
                    n += self.apply_gauge(&m.api_cost_daily_usd, &cost_aggregate_query()).await?;
                }
                Ok(n)
            }
        }
    }

    async fn apply_gauge(&self, gauge: &GaugeVec, q: &GaugeQuery) -> Result<usize> {
        let rows = self.query(&q.sql, q.order_by()).await?;
        let samples = map_rows(&rows, q.labels, q.value_column);
        Ok(apply_samples(gauge, &samples, q.newest_first))
    }

    async fn collect_rate_limits(&self) -> Result<usize> {
        let m = self.metrics();
        let q = rate_limit_query();
        let rows = self.query(&q.sql, q.order_by()).await?;

        for row in rows.iter().rev() {
            let s = Sample::from_row(row, q.labels, q.value_column);
            let labels = s.label_pairs();
            m.api_rate_limit_remaining.set(&labels, s.value);
            if let Some(pct) = consumed_percent(row, s.value) {
                m.api_rate_limit_consumed_percent.set(&labels, pct);
            }
        }
        Ok(rows.len())
    }
}
