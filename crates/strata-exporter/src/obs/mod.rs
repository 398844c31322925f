//! In-process metrics registry and Prometheus text rendering.
//!
//! Instruments are stored as atomics and rendered by the `/metrics` handler.

pub mod metrics;

pub use metrics::{CounterVec, ExporterMetrics, GaugeVec, HistogramVec};
