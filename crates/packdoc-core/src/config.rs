//! Process-wide engine configuration.
//!
//! Configuration is installed once at startup and read lock-free on the
//! retain/release hot path.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

///
/// CONSTANTS
///

/// Exclusive upper bound of a legal reference count.
pub const DEFAULT_MAX_REF_COUNT: i32 = 10_000_000;

static CAREFUL_REF_COUNTS: AtomicBool = AtomicBool::new(cfg!(debug_assertions));
static MAX_REF_COUNT: AtomicI32 = AtomicI32::new(DEFAULT_MAX_REF_COUNT);

///
/// RefCountChecks
///
/// Whether retain/release validate the previous count before trusting it.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RefCountChecks {
    /// Validate every transition and report violations.
    Careful,
    /// Plain atomic increment/decrement.
    Fast,
}

impl RefCountChecks {
    /// Build-profile default: careful with debug assertions, fast otherwise.
    #[must_use]
    pub const fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Careful
        } else {
            Self::Fast
        }
    }
}

///
/// EngineConfig
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EngineConfig {
    pub ref_count_checks: RefCountChecks,

    /// Counts at or above this value are treated as corrupted bookkeeping.
    pub max_ref_count: i32,
}

impl EngineConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ref_count_checks: RefCountChecks::for_build(),
            max_ref_count: DEFAULT_MAX_REF_COUNT,
        }
    }

    #[must_use]
    pub const fn with_ref_count_checks(mut self, checks: RefCountChecks) -> Self {
        self.ref_count_checks = checks;
        self
    }

    #[must_use]
    pub const fn with_max_ref_count(mut self, max_ref_count: i32) -> Self {
        self.max_ref_count = max_ref_count;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a process-wide configuration.
pub fn install(config: EngineConfig) {
    CAREFUL_REF_COUNTS.store(
        matches!(config.ref_count_checks, RefCountChecks::Careful),
        Ordering::Relaxed,
    );
    MAX_REF_COUNT.store(config.max_ref_count.max(2), Ordering::Relaxed);
}

/// Read back the currently installed configuration.
#[must_use]
pub fn current() -> EngineConfig {
    let checks = if CAREFUL_REF_COUNTS.load(Ordering::Relaxed) {
        RefCountChecks::Careful
    } else {
        RefCountChecks::Fast
    };

    EngineConfig {
        ref_count_checks: checks,
        max_ref_count: max_ref_count(),
    }
}

pub(crate) fn careful_ref_counts() -> bool {
    CAREFUL_REF_COUNTS.load(Ordering::Relaxed)
}

pub(crate) fn max_ref_count() -> i32 {
    MAX_REF_COUNT.load(Ordering::Relaxed)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_follows_build_profile() {
        let config = EngineConfig::default();
        assert_eq!(config.ref_count_checks, RefCountChecks::for_build());
        assert_eq!(config.max_ref_count, DEFAULT_MAX_REF_COUNT);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = EngineConfig::new()
            .with_ref_count_checks(RefCountChecks::Fast)
            .with_max_ref_count(64);
        assert_eq!(config.ref_count_checks, RefCountChecks::Fast);
        assert_eq!(config.max_ref_count, 64);
    }
}
