//! Shared application state for the exporter.
//!
//! Built once at startup, before the HTTP listener binds. The collector is
//! the only writer to the registry; handlers only render it.

use std::sync::Arc;

use crate::collector::Collector;
use crate::obs::ExporterMetrics;

#[derive(Clone)]
pub struct AppState {
    metrics: Arc<ExporterMetrics>,
    collector: Arc<Collector>,
}

impl AppState {
    pub fn new(metrics: Arc<ExporterMetrics>, collector: Arc<Collector>) -> Self {
        Self { metrics, collector }
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    /// Ready once the first cycle has finished.
    pub fn is_ready(&self) -> bool {
        self.collector.cycles_completed() > 0
    }
}
