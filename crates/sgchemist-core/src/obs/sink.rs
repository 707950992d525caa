//! Metrics sink boundary.
//!
//! Session logic never touches the counters directly; every measurement
//! flows through `MetricsEvent` and a `MetricsSink`.

use crate::obs::metrics;
use std::cell::RefCell;

///
/// WriteKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteKind {
    Create,
    Update,
    Delete,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    Find {
        entity_type: &'static str,
        rows: u64,
    },
    Summarize {
        entity_type: &'static str,
    },
    Write {
        kind: WriteKind,
        entity_type: &'static str,
    },
    Commit {
        writes: u64,
    },
    Rollback {
        writes: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

///
/// MemoryMetrics
/// Sink keeping every event it receives, in order.
///

#[derive(Debug, Default)]
pub struct MemoryMetrics {
    events: RefCell<Vec<MetricsEvent>>,
}

impl MemoryMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<MetricsEvent> {
        self.events.borrow().clone()
    }

    /// Writes of `kind` recorded so far.
    #[must_use]
    pub fn writes(&self, kind: WriteKind) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, MetricsEvent::Write { kind: k, .. } if *k == kind))
            .count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl MetricsSink for MemoryMetrics {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// GlobalMetricsSink
/// Default sink writing into the thread-local counters.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::Find { entity_type, rows } => {
                m.ops.find_calls = m.ops.find_calls.saturating_add(1);
                m.ops.rows_found = m.ops.rows_found.saturating_add(rows);

                let entry = m.entities.entry(entity_type.to_string()).or_default();
                entry.find_calls = entry.find_calls.saturating_add(1);
                entry.rows_found = entry.rows_found.saturating_add(rows);
            }

            MetricsEvent::Summarize { entity_type } => {
                m.ops.summarize_calls = m.ops.summarize_calls.saturating_add(1);

                let entry = m.entities.entry(entity_type.to_string()).or_default();
                entry.summarize_calls = entry.summarize_calls.saturating_add(1);
            }

            MetricsEvent::Write { kind, entity_type } => {
                let entry = m.entities.entry(entity_type.to_string()).or_default();
                match kind {
                    WriteKind::Create => {
                        m.ops.create_calls = m.ops.create_calls.saturating_add(1);
                        entry.create_calls = entry.create_calls.saturating_add(1);
                    }
                    WriteKind::Update => {
                        m.ops.update_calls = m.ops.update_calls.saturating_add(1);
                        entry.update_calls = entry.update_calls.saturating_add(1);
                    }
                    WriteKind::Delete => {
                        m.ops.delete_calls = m.ops.delete_calls.saturating_add(1);
                        entry.delete_calls = entry.delete_calls.saturating_add(1);
                    }
                }
            }

            MetricsEvent::Commit { writes } => {
                m.ops.commits = m.ops.commits.saturating_add(1);
                m.ops.writes_committed = m.ops.writes_committed.saturating_add(writes);
            }

            MetricsEvent::Rollback { writes } => {
                m.ops.rollbacks = m.ops.rollbacks.saturating_add(1);
                m.ops.writes_discarded = m.ops.writes_discarded.saturating_add(writes);
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

/// Route an event to `sink`, or to the global counters when none is set.
pub(crate) fn record(sink: Option<&dyn MetricsSink>, event: MetricsEvent) {
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current thread's counters.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset the current thread's counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}
