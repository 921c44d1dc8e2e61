use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for value and cursor lifecycles.
///
/// State is thread-local: a report reflects the events recorded by the
/// calling thread only.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub tags: BTreeMap<String, TagCounters>,
    pub window_start_ms: i64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            tags: BTreeMap::new(),
            window_start_ms: Utc::now().timestamp_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Heap values
    pub heap_allocs: u64,
    pub heap_bytes: u64,

    // Ownership
    pub retains: u64,
    pub releases: u64,
    pub deallocs: u64,
    pub lifecycle_violations: u64,

    // Mutable collections
    pub mutable_copies: u64,
    pub mutable_copies_reused: u64,

    // Cursors
    pub cursor_pushes: u64,
    pub cursor_values: u64,
    pub cursor_sorts: u64,
}

///
/// TagCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TagCounters {
    pub heap_allocs: u64,
    pub mutable_copies: u64,
}

///
/// EventReport
/// Point-in-time snapshot returned by `metrics_report`.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Counters recorded since the window start, if the window matched.
    pub counters: Option<EventState>,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters and restart the window.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Snapshot counters if the current window started at or after `window_start_ms`.
pub(crate) fn report_window_start(window_start_ms: Option<i64>) -> EventReport {
    with_state(|m| {
        let include = window_start_ms.is_none_or(|start| start <= m.window_start_ms);

        EventReport {
            counters: include.then(|| m.clone()),
        }
    })
}
