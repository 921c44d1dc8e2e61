//! Metrics sink boundary.
//!
//! Core engine logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between engine logic
//! and the metrics state.
use crate::obs::metrics;
use packdoc_primitives::Tag;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    HeapAlloc { tag: Tag, bytes: usize },
    Retain,
    Release,
    Dealloc,
    LifecycleViolation,
    MutableCopy { tag: Tag, reused: bool },
    CursorPush { values: usize },
    CursorSort { values: usize },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::HeapAlloc { tag, bytes } => {
                metrics::with_state_mut(|m| {
                    m.ops.heap_allocs = m.ops.heap_allocs.saturating_add(1);
                    m.ops.heap_bytes = m.ops.heap_bytes.saturating_add(bytes as u64);
                    let entry = m.tags.entry(tag.label().to_string()).or_default();
                    entry.heap_allocs = entry.heap_allocs.saturating_add(1);
                });
            }

            MetricsEvent::Retain => {
                metrics::with_state_mut(|m| m.ops.retains = m.ops.retains.saturating_add(1));
            }

            MetricsEvent::Release => {
                metrics::with_state_mut(|m| m.ops.releases = m.ops.releases.saturating_add(1));
            }

            MetricsEvent::Dealloc => {
                metrics::with_state_mut(|m| m.ops.deallocs = m.ops.deallocs.saturating_add(1));
            }

            MetricsEvent::LifecycleViolation => {
                metrics::with_state_mut(|m| {
                    m.ops.lifecycle_violations = m.ops.lifecycle_violations.saturating_add(1);
                });
            }

            MetricsEvent::MutableCopy { tag, reused } => {
                metrics::with_state_mut(|m| {
                    if reused {
                        m.ops.mutable_copies_reused = m.ops.mutable_copies_reused.saturating_add(1);
                    } else {
                        m.ops.mutable_copies = m.ops.mutable_copies.saturating_add(1);
                        let entry = m.tags.entry(tag.label().to_string()).or_default();
                        entry.mutable_copies = entry.mutable_copies.saturating_add(1);
                    }
                });
            }

            MetricsEvent::CursorPush { values } => {
                metrics::with_state_mut(|m| {
                    m.ops.cursor_pushes = m.ops.cursor_pushes.saturating_add(1);
                    m.ops.cursor_values = m.ops.cursor_values.saturating_add(values as u64);
                });
            }

            MetricsEvent::CursorSort { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.cursor_sorts = m.ops.cursor_sorts.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // Preconditions:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`.
        // - `with_metrics_sink` always restores the previous pointer before returning,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        //
        // Aliasing:
        // - Only a shared reference is materialized, matching the shared borrow
        //   used to install the override.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the calling thread's metrics state.
///
/// `window_start_ms` filters by window start (`EventState::window_start_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<i64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state on the calling thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // Preconditions:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` always restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink<'a> {
        calls: &'a AtomicUsize,
    }

    impl MetricsSink for CountingSink<'_> {
        fn record(&self, _: MetricsEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn with_metrics_sink_routes_and_restores_nested_overrides() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });

        let outer_calls = AtomicUsize::new(0);
        let inner_calls = AtomicUsize::new(0);
        let outer = CountingSink {
            calls: &outer_calls,
        };
        let inner = CountingSink {
            calls: &inner_calls,
        };

        record(MetricsEvent::Retain);
        assert_eq!(outer_calls.load(Ordering::SeqCst), 0);

        with_metrics_sink(&outer, || {
            record(MetricsEvent::Retain);
            with_metrics_sink(&inner, || {
                record(MetricsEvent::Release);
            });
            record(MetricsEvent::Dealloc);
        });

        assert_eq!(outer_calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| {
            assert!(cell.borrow().is_none());
        });
    }

    #[test]
    fn with_metrics_sink_restores_override_on_panic() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });

        let calls = AtomicUsize::new(0);
        let sink = CountingSink { calls: &calls };

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(&sink, || {
                record(MetricsEvent::Retain);
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();
        assert!(panicked);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        SINK_OVERRIDE.with(|cell| {
            assert!(cell.borrow().is_none());
        });
    }

    #[test]
    fn heap_and_cursor_events_accumulate() {
        metrics_reset_all();

        record(MetricsEvent::HeapAlloc {
            tag: Tag::String,
            bytes: 7,
        });
        record(MetricsEvent::MutableCopy {
            tag: Tag::Array,
            reused: false,
        });
        record(MetricsEvent::MutableCopy {
            tag: Tag::Array,
            reused: true,
        });
        record(MetricsEvent::CursorPush { values: 3 });
        record(MetricsEvent::CursorPush { values: 2 });

        let counters = metrics_report(None)
            .counters
            .expect("metrics report should include counters");
        assert_eq!(counters.ops.heap_allocs, 1);
        assert_eq!(counters.ops.heap_bytes, 7);
        assert_eq!(counters.ops.mutable_copies, 1);
        assert_eq!(counters.ops.mutable_copies_reused, 1);
        assert_eq!(counters.ops.cursor_pushes, 2);
        assert_eq!(counters.ops.cursor_values, 5);
        assert_eq!(counters.tags["string"].heap_allocs, 1);
        assert_eq!(counters.tags["array"].mutable_copies, 1);
    }

    #[test]
    fn metrics_report_window_start_after_window_returns_empty() {
        metrics_reset_all();
        let window_start = metrics::with_state(|m| m.window_start_ms);
        record(MetricsEvent::Retain);

        let report = metrics_report(Some(window_start.saturating_add(1)));
        assert!(report.counters.is_none());

        let report = metrics_report(Some(window_start.saturating_sub(1)));
        assert!(report.counters.is_some());
    }

    #[test]
    fn metrics_report_serializes_to_json() {
        metrics_reset_all();
        record(MetricsEvent::CursorSort { values: 4 });

        let json = serde_json::to_value(metrics_report(None)).expect("report should serialize");
        assert_eq!(json["counters"]["ops"]["cursor_sorts"], 1);
    }
}
