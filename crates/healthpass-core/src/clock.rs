//! Injectable wall-clock source.
//!
//! Scheduling logic never reads ambient time directly. The caller hands the
//! scheduler a `Clock`, so due-checks are deterministic in tests and the two
//! delivery channels agree on what "now" means within one tick.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic scheduler tests.
///
/// Clones share the same underlying instant, so a test can hold one handle
/// while the scheduler owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.lock() = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut t = self.lock();
        *t = *t + by;
    }

    // Recover from a poisoned lock so the handle stays usable after a
    // panicking test.
    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        self.current.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}
