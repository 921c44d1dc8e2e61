//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Engine code never touches `obs::metrics` directly; every counter update
//! flows through `sink::record`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, EventState, TagCounters};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
