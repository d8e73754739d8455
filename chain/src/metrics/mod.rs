//! Metrics and instrumentation for the chain (ambient, §4.13).
//!
//! Prometheus-compatible counters/histograms plus a small HTTP exporter
//! serving `/metrics`, grounded on the teacher's `metrics/prometheus.rs`.

pub mod prometheus;

pub use prometheus::{run_prometheus_http_server, ChainMetrics, MetricsRegistry};
