//! Observability: in-process counters and the sink abstraction.
//!
//! Sessions report through `MetricsSink`; without an explicit sink,
//! events land in thread-local counters readable via `metrics_report`.

pub(crate) mod metrics;
pub(crate) mod sink;


// re-exports
pub use metrics::{EntityCounters, EventOps, EventReport, EventState};
pub use sink::{
    MemoryMetrics, MetricsEvent, MetricsSink, WriteKind, metrics_report, metrics_reset_all,
};
