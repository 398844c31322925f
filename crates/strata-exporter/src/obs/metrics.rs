//! Metrics registry for the exporter.
//!
//! Counter/gauge/histogram families with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors to keep deterministic ordering.
//! Values are `f64` stored as bit patterns in `AtomicU64`, so each per-label
//! update is a single atomic operation and a scrape never waits on the
//! collector. A scrape taken mid-cycle sees a mix of old and new values.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

type LabelKey = Vec<(String, String)>;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

/// `name{labels}` or bare `name` when the label set is empty.
fn series(name: &str, labels: &str) -> String {
    if labels.is_empty() {
        name.to_string()
    } else {
        format!("{}{{{}}}", name, labels)
    }
}

/// Sample value in exposition syntax.
pub(crate) fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        v.to_string()
    }
}

fn header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

/// Iterate a family's series sorted by label key.
fn sorted<V, T>(map: &DashMap<LabelKey, V>, f: impl Fn(&V) -> T) -> Vec<(LabelKey, T)> {
    let mut rows: Vec<(LabelKey, T)> = map.iter().map(|r| (r.key().clone(), f(r.value()))).collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

#[derive(Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(v: f64) -> Self {
        Self(AtomicU64::new(v.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    fn add(&self, v: f64) {
        let mut cur = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(cur) + v).to_bits();
            match self.0.compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return,
                Err(actual) => cur = actual,
            }
        }
    }
}

pub struct CounterVec {
    name: &'static str,
    help: &'static str,
    map: DashMap<LabelKey, AtomicF64>,
}

impl CounterVec {
    pub fn new(name: &'static str, help: &'static str) -> Self {
        Self { name, help, map: DashMap::new() }
    }

    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1.0);
    }

    /// Increment by a non-negative value. Negative deltas are ignored.
    pub fn add(&self, labels: &[(&str, &str)], v: f64) {
        if v.is_nan() || v < 0.0 {
            return;
        }
        let counter = self.map.entry(label_key(labels)).or_default();
        counter.add(v);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Option<f64> {
        self.map.get(&label_key(labels)).map(|c| c.load())
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, out: &mut String) {
        header(out, self.name, self.help, "counter");
        for (key, val) in sorted(&self.map, AtomicF64::load) {
            let _ = writeln!(out, "{} {}", series(self.name, &label_str(&key)), fmt_value(val));
        }
    }
}

pub struct GaugeVec {
    name: &'static str,
    help: &'static str,
    map: DashMap<LabelKey, AtomicF64>,
}

impl GaugeVec {
    pub fn new(name: &'static str, help: &'static str) -> Self {
        Self { name, help, map: DashMap::new() }
    }

    /// Replace the value for one label set. Other label sets are untouched.
    pub fn set(&self, labels: &[(&str, &str)], v: f64) {
        self.map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicF64::new(v))
            .store(v);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Option<f64> {
        self.map.get(&label_key(labels)).map(|g| g.load())
    }

    /// Number of distinct label sets ever written.
    pub fn series_count(&self) -> usize {
        self.map.len()
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, out: &mut String) {
        header(out, self.name, self.help, "gauge");
        for (key, val) in sorted(&self.map, AtomicF64::load) {
            let _ = writeln!(out, "{} {}", series(self.name, &label_str(&key)), fmt_value(val));
        }
    }
}

/// Prometheus client default buckets (seconds).
pub const DEFAULT_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicF64,
    buckets: Vec<AtomicU64>,
}

impl AtomicHistogram {
    fn new(n: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicF64::new(0.0),
            buckets: (0..n).map(|_| AtomicU64::new(0)).collect(),
        }
    }
}

struct HistogramSnapshot {
    count: u64,
    sum: f64,
    buckets: Vec<u64>,
}

pub struct HistogramVec {
    name: &'static str,
    help: &'static str,
    bounds: Vec<f64>,
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    /// `bounds` are upper bucket edges; they are sorted and `+Inf` is implicit.
    pub fn new(name: &'static str, help: &'static str, bounds: &[f64]) -> Self {
        let mut bounds: Vec<f64> = bounds.iter().copied().filter(|b| b.is_finite()).collect();
        bounds.sort_by(f64::total_cmp);
        bounds.dedup();
        Self { name, help, bounds, map: DashMap::new() }
    }

    /// Observe a value and increment cumulative buckets.
    pub fn observe(&self, labels: &[(&str, &str)], v: f64) {
        let n = self.bounds.len();
        let hist = self.map.entry(label_key(labels)).or_insert_with(|| AtomicHistogram::new(n));

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.add(v);

        // Cumulative buckets: increment every bucket whose edge is >= value.
        for (i, &le) in self.bounds.iter().enumerate() {
            if v <= le {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Observe a duration in seconds.
    pub fn observe_duration(&self, labels: &[(&str, &str)], d: Duration) {
        self.observe(labels, d.as_secs_f64());
    }

    /// Observation count for one label set.
    pub fn count(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|h| h.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, out: &mut String) {
        header(out, self.name, self.help, "histogram");
        let snapshots = sorted(&self.map, |h| HistogramSnapshot {
            count: h.count.load(Ordering::Relaxed),
            sum: h.sum.load(),
            buckets: h.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect(),
        });

        for (key, snap) in snapshots {
            let labels = label_str(&key);
            let prefix = if labels.is_empty() { String::new() } else { format!("{},", labels) };

            for (le, count) in self.bounds.iter().zip(&snap.buckets) {
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", self.name, prefix, fmt_value(*le), count);
            }
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", self.name, prefix, snap.count);

            let base = format!("{}_sum", self.name);
            let _ = writeln!(out, "{} {}", series(&base, &labels), fmt_value(snap.sum));
            let base = format!("{}_count", self.name);
            let _ = writeln!(out, "{} {}", series(&base, &labels), snap.count);
        }
    }
}

/// Every instrument the exporter publishes.
pub struct ExporterMetrics {
    // API usage
    pub api_requests_total: CounterVec,
    pub api_rate_limit_remaining: GaugeVec,
    pub api_rate_limit_consumed_percent: GaugeVec,
    pub api_response_time: HistogramVec,

    // ticket throughput
    pub tickets_processed_total: CounterVec,
    pub tickets_processed_hourly: GaugeVec,
    pub tickets_processed_daily: GaugeVec,

    // quality
    pub automation_rate: GaugeVec,
    pub similarity_score_avg: GaugeVec,
    pub similarity_score_distribution: HistogramVec,
    pub csat_score: GaugeVec,
    pub resolution_time: HistogramVec,
    pub resolution_time_avg: GaugeVec,

    // cost
    pub api_cost_per_ticket_usd: GaugeVec,
    pub api_cost_daily_usd: GaugeVec,
    pub api_cost_total_usd: CounterVec,

    // exporter health
    pub db_connection_status: GaugeVec,
    pub collection_duration: HistogramVec,
    pub collection_errors: CounterVec,
    pub exporter_info: GaugeVec,
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterMetrics {
    pub fn new() -> Self {
        Self {
            api_requests_total: CounterVec::new("api_requests_total", "Total API requests by provider"),
            api_rate_limit_remaining: GaugeVec::new(
                "api_rate_limit_remaining",
                "Remaining API rate limit by provider",
            ),
            api_rate_limit_consumed_percent: GaugeVec::new(
                "api_rate_limit_consumed_percent",
                "Percentage of API rate limit consumed",
            ),
            api_response_time: HistogramVec::new(
                "api_response_time_seconds",
                "API response time in seconds",
                &[0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0],
            ),
            tickets_processed_total: CounterVec::new("tickets_processed_total", "Total tickets processed"),
            tickets_processed_hourly: GaugeVec::new(
                "tickets_processed_hourly",
                "Tickets processed in the last hour",
            ),
            tickets_processed_daily: GaugeVec::new(
                "tickets_processed_daily",
                "Tickets processed in the last 24 hours",
            ),
            automation_rate: GaugeVec::new("automation_rate", "Automation rate by category (0-1)"),
            similarity_score_avg: GaugeVec::new("similarity_score_avg", "Average similarity score"),
            similarity_score_distribution: HistogramVec::new(
                "similarity_score_distribution",
                "Distribution of similarity scores",
                &[0.3, 0.4, 0.5, 0.6, 0.7, 0.75, 0.8, 0.85, 0.9, 0.95, 1.0],
            ),
            csat_score: GaugeVec::new("csat_score", "Customer satisfaction score (1-5)"),
            resolution_time: HistogramVec::new(
                "resolution_time_seconds",
                "Time to resolution in seconds",
                &[60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0, 14400.0, 28800.0, 86400.0, 172800.0],
            ),
            resolution_time_avg: GaugeVec::new(
                "resolution_time_avg_seconds",
                "Average resolution time in seconds",
            ),
            api_cost_per_ticket_usd: GaugeVec::new("api_cost_per_ticket_usd", "API cost per ticket in USD"),
            api_cost_daily_usd: GaugeVec::new(
                "api_cost_daily_usd",
                "API cost over the last 24 hours in USD by provider and model",
            ),
            api_cost_total_usd: CounterVec::new("api_cost_total_usd", "Total API costs in USD"),
            db_connection_status: GaugeVec::new(
                "db_connection_status",
                "Database connection status (1=up, 0=down)",
            ),
            collection_duration: HistogramVec::new(
                "metrics_collection_duration_seconds",
                "Time taken to collect metrics",
                DEFAULT_BUCKETS,
            ),
            collection_errors: CounterVec::new(
                "metrics_collection_errors_total",
                "Collection steps that failed, by step",
            ),
            exporter_info: GaugeVec::new("metrics_exporter_info", "Information about the metrics exporter"),
        }
    }

    /// Publish static exporter information as a constant `1` gauge.
    pub fn set_info(&self, labels: &[(&str, &str)]) {
        self.exporter_info.set(labels, 1.0);
    }

    /// Render all registered metrics.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.api_requests_total.render(&mut out);
        self.api_rate_limit_remaining.render(&mut out);
        self.api_rate_limit_consumed_percent.render(&mut out);
        self.api_response_time.render(&mut out);
        self.tickets_processed_total.render(&mut out);
        self.tickets_processed_hourly.render(&mut out);
        self.tickets_processed_daily.render(&mut out);
        self.automation_rate.render(&mut out);
        self.similarity_score_avg.render(&mut out);
        self.similarity_score_distribution.render(&mut out);
        self.csat_score.render(&mut out);
        self.resolution_time.render(&mut out);
        self.resolution_time_avg.render(&mut out);
        self.api_cost_per_ticket_usd.render(&mut out);
        self.api_cost_daily_usd.render(&mut out);
        self.api_cost_total_usd.render(&mut out);
        self.db_connection_status.render(&mut out);
        self.collection_duration.render(&mut out);
        self.collection_errors.render(&mut out);
        self.exporter_info.render(&mut out);
        out
    }
}
