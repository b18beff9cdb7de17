//! Sources of the current time.

use chrono::{Local, NaiveDateTime};

/// A source of the current local date and time.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// The system wall clock, in the local time zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that is stopped at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(NaiveDateTime);

impl FixedClock {
    /// Creates a clock that always reports `now`.
    #[inline]
    pub fn new(now: NaiveDateTime) -> Self {
        Self(now)
    }
}

impl Clock for FixedClock {
    #[inline]
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
