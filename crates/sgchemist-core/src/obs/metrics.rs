use serde::Serialize;
use std::{cell::RefCell, collections::BTreeMap};
use time::OffsetDateTime;

///
/// EventState
/// Ephemeral, in-memory counters for session operations.
///

#[derive(Clone, Debug, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    pub since_ms: i64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Reads
    pub find_calls: u64,
    pub rows_found: u64,
    pub summarize_calls: u64,

    // Writes
    pub create_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,

    // Unit of work
    pub commits: u64,
    pub rollbacks: u64,
    pub writes_committed: u64,
    pub writes_discarded: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct EntityCounters {
    pub find_calls: u64,
    pub rows_found: u64,
    pub summarize_calls: u64,
    pub create_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,
}

///
/// EventReport
/// Point-in-time copy of the counters.
///

pub type EventReport = EventState;

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Snapshot the current state.
pub(crate) fn report() -> EventReport {
    EVENT_STATE.with(|m| m.borrow().clone())
}

/// Reset all counters (useful in tests).
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

fn now_millis() -> i64 {
    i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or_default()
}
