//! Collector loop.
//!
//! One sequential task runs every step in [`StepId::ALL`] order, then sleeps
//! for the configured interval. The sleep starts after the cycle finishes, so
//! cycle duration adds to the effective period.
//!
//! Failure isolation happens in one place, [`Collector::run_step`]: an error
//! or panic there is logged, counted and observed, and the next step runs.
//! [`Collector::run_forever`] still catches anything escaping a whole cycle.

pub mod steps;

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;

use strata_core::error::{ErrorKind, Result, StrataError};
use strata_core::Row;

use crate::obs::ExporterMetrics;
use crate::source::MetricSource;

pub use steps::StepId;

#[derive(Debug, Clone, Copy, Default)]
pub struct CollectorOptions {
    /// Also run the aggregate provider/model cost query.
    pub cost_aggregate: bool,
}

/// Result of one step within a cycle.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step: StepId,
    pub elapsed: Duration,
    /// Samples written, or the error kind that stopped the step.
    pub result: std::result::Result<usize, ErrorKind>,
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub outcomes: Vec<StepOutcome>,
}

impl CycleReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn samples(&self) -> usize {
        self.outcomes.iter().filter_map(|o| o.result.ok()).sum()
    }

    pub fn outcome(&self, step: StepId) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.step == step)
    }
}

pub struct Collector {
    source: Arc<dyn MetricSource>,
    metrics: Arc<ExporterMetrics>,
    options: CollectorOptions,
    cycles: AtomicU64,
}

impl Collector {
    pub fn new(source: Arc<dyn MetricSource>, metrics: Arc<ExporterMetrics>, options: CollectorOptions) -> Self {
        Self {
            source,
            metrics,
            options,
            cycles: AtomicU64::new(0),
        }
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    pub fn options(&self) -> CollectorOptions {
        self.options
    }

    /// Cycles that ran to completion since startup.
    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Fetch rows and keep `db_connection_status` in line with the outcome.
    pub(crate) async fn query(&self, sql: &str, order_by: Option<&str>) -> Result<Vec<Row>> {
        let res = self.source.fetch(sql, order_by).await;
        let up = match &res {
            Err(e) if e.is_connection() => 0.0,
            _ => 1.0,
        };
        self.metrics.db_connection_status.set(&[], up);
        res
    }

    /// Run a single step behind the failure boundary.
    pub async fn run_step(&self, step: StepId) -> StepOutcome {
        let name = step.as_str();
        tracing::debug!(step = name, source = self.source.name(), "collecting");

        let started = Instant::now();
        let res = match AssertUnwindSafe(self.collect(step)).catch_unwind().await {
            Ok(res) => res,
            Err(panic) => Err(StrataError::Internal(format!(
                "step panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };
        let elapsed = started.elapsed();

        self.metrics
            .collection_duration
            .observe_duration(&[("metric_type", name)], elapsed);

        let result = match res {
            Ok(samples) => {
                tracing::info!(step = name, samples, elapsed_ms = elapsed.as_millis() as u64, "collected");
                Ok(samples)
            }
            Err(e) => {
                tracing::error!(step = name, code = e.kind().as_str(), error = %e, "collection step failed");
                self.metrics.collection_errors.inc(&[("metric_type", name)]);
                Err(e.kind())
            }
        };

        StepOutcome { step, elapsed, result }
    }

    /// Run every step once, in order.
    pub async fn run_cycle(&self) -> CycleReport {
        tracing::info!("starting metrics collection cycle");

        let mut report = CycleReport::default();
        for step in StepId::ALL {
            report.outcomes.push(self.run_step(step).await);
        }

        self.cycles.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            samples = report.samples(),
            failed_steps = report.failed(),
            "metrics collection cycle complete"
        );
        report
    }

    /// Collect, sleep, repeat. Never returns.
    pub async fn run_forever(self: Arc<Self>, interval: Duration) {
        loop {
            let cycle = AssertUnwindSafe(self.run_cycle()).catch_unwind().await;
            if let Err(panic) = cycle {
                tracing::error!(reason = panic_message(panic.as_ref()), "collection cycle panicked");
            }
            tokio::time::sleep(interval).await;
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
