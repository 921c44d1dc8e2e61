//! Reference-counted ownership shared by every heap-allocated engine object.
//!
//! Memory is owned by an `Arc`; the embedded [`RefCount`] mirrors the number
//! of live [`Retained`] handles so misuse is caught at the transition that
//! caused it. In careful mode (see `config`) every transition validates the
//! previous count before trusting it.


use crate::{
    config,
    obs::sink::{self, MetricsEvent},
};
use std::{
    any::type_name,
    fmt,
    ops::Deref,
    sync::{
        Arc,
        atomic::{AtomicI32, Ordering},
    },
};
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

/// Count carried by statically constructed objects that have never been
/// retained. The first retain moves it to 1.
pub const STATIC_INITIAL_REF_COUNT: i32 = -6_666_666;

/// Count written into an object once it has been destructed.
pub const DESTRUCTED_REF_COUNT: i32 = -9_999_999;

///
/// LifecycleError
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
pub enum LifecycleError {
    #[error("ref-counted object retained while it had an invalid ref count of {count} ({count:#x})")]
    Retained { count: i32 },

    #[error("ref-counted object released while it had an invalid ref count of {count} ({count:#x})")]
    Released { count: i32 },

    #[error("ref-counted object destructed while it had an invalid ref count of {count} ({count:#x})")]
    Destructed { count: i32 },
}

impl LifecycleError {
    /// Previous count observed by the failing transition.
    #[must_use]
    pub const fn count(self) -> i32 {
        match self {
            Self::Retained { count } | Self::Released { count } | Self::Destructed { count } => {
                count
            }
        }
    }
}

///
/// RefCount
///
/// Atomic signed owner count. Starts at 1 for dynamic objects or at
/// [`STATIC_INITIAL_REF_COUNT`] for objects built in a `static`.
///

pub struct RefCount {
    count: AtomicI32,
}

impl RefCount {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: AtomicI32::new(1),
        }
    }

    /// Counter for a statically constructed object.
    #[must_use]
    pub const fn new_static() -> Self {
        Self {
            count: AtomicI32::new(STATIC_INITIAL_REF_COUNT),
        }
    }

    #[must_use]
    pub fn get(&self) -> i32 {
        self.count.load(Ordering::Acquire)
    }

    /// Add one owner, validating according to the installed configuration.
    /// Returns the new count.
    pub fn retain(&self) -> Result<i32, LifecycleError> {
        if config::careful_ref_counts() {
            self.retain_checked()
        } else {
            sink::record(MetricsEvent::Retain);
            Ok(self.count.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
        }
    }

    /// Drop one owner, validating according to the installed configuration.
    /// Returns `true` when the last owner was released.
    pub fn release(&self) -> Result<bool, LifecycleError> {
        if config::careful_ref_counts() {
            self.release_checked()
        } else {
            sink::record(MetricsEvent::Release);
            Ok(self.count.fetch_sub(1, Ordering::AcqRel) <= 1)
        }
    }

    /// Add one owner and validate the previous count regardless of mode.
    pub fn retain_checked(&self) -> Result<i32, LifecycleError> {
        sink::record(MetricsEvent::Retain);

        let old = self.count.fetch_add(1, Ordering::Relaxed);
        if old == STATIC_INITIAL_REF_COUNT {
            self.count.store(1, Ordering::Relaxed);
            return Ok(1);
        }
        if !in_live_range(old) {
            return Err(fail(LifecycleError::Retained { count: old }));
        }

        Ok(old + 1)
    }

    /// Drop one owner and validate the previous count regardless of mode.
    pub fn release_checked(&self) -> Result<bool, LifecycleError> {
        sink::record(MetricsEvent::Release);

        let old = self.count.fetch_sub(1, Ordering::AcqRel);
        if !in_live_range(old) {
            return Err(fail(LifecycleError::Released { count: old }));
        }

        Ok(old == 1)
    }

    /// Mark the object destructed. The count must be zero, or still the
    /// untouched static sentinel.
    pub fn destruct(&self) -> Result<(), LifecycleError> {
        let old = self.count.swap(DESTRUCTED_REF_COUNT, Ordering::AcqRel);
        if old != 0 && old != STATIC_INITIAL_REF_COUNT {
            return Err(fail(LifecycleError::Destructed { count: old }));
        }

        Ok(())
    }
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RefCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefCount").field(&self.get()).finish()
    }
}

fn in_live_range(count: i32) -> bool {
    count > 0 && count < config::max_ref_count()
}

// Report a lifetime violation; the caller turns it into an error.
fn fail(err: LifecycleError) -> LifecycleError {
    sink::record(MetricsEvent::LifecycleViolation);
    tracing::error!(ref_count = err.count(), error = %err, "lifecycle.violation");

    err
}

///
/// Retained
///
/// Owning handle to a shared, reference-counted `T`.
///
/// Handles are duplicated with [`Retained::retain`] and given up either by
/// dropping them or with [`Retained::release`], which also reports
/// violations to the caller. The value is deallocated when the last handle
/// goes away.
///

pub struct Retained<T> {
    inner: Arc<Counted<T>>,
    released: bool,
}

struct Counted<T> {
    refs: RefCount,
    value: T,
}

impl<T> Drop for Counted<T> {
    fn drop(&mut self) {
        // violation already logged and counted by `fail`
        let _ = self.refs.destruct();
        sink::record(MetricsEvent::Dealloc);
    }
}

impl<T> Retained<T> {
    /// Take ownership of `value` with a count of 1.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Counted {
                refs: RefCount::new(),
                value,
            }),
            released: false,
        }
    }

    /// Share ownership with a new handle.
    pub fn retain(&self) -> Result<Self, LifecycleError> {
        self.inner.refs.retain()?;

        Ok(Self {
            inner: Arc::clone(&self.inner),
            released: false,
        })
    }

    /// Give up this handle, reporting any count violation.
    pub fn release(mut self) -> Result<(), LifecycleError> {
        self.released = true;
        self.inner.refs.release().map(|_| ())
    }

    /// Current logical owner count.
    #[must_use]
    pub fn ref_count(&self) -> i32 {
        self.inner.refs.get()
    }

    /// Whether both handles share the same allocation.
    #[must_use]
    pub fn ptr_eq(left: &Self, right: &Self) -> bool {
        Arc::ptr_eq(&left.inner, &right.inner)
    }

    /// Point `slot` at `src`, retaining the new owner before releasing the
    /// old one. Assigning a handle to itself is a no-op.
    pub fn assign(slot: &mut Self, src: &Self) -> Result<(), LifecycleError> {
        if Self::ptr_eq(slot, src) {
            return Ok(());
        }

        let old = std::mem::replace(slot, src.retain()?);
        old.release()
    }
}

impl<T> Drop for Retained<T> {
    fn drop(&mut self) {
        if !self.released {
            // violation already logged and counted by `fail`
            let _ = self.inner.refs.release();
        }
    }
}

impl<T> Deref for Retained<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Retained<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("ref_count", &self.ref_count())
            .field("value", &self.inner.value)
            .finish()
    }
}
