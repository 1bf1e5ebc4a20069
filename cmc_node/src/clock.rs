//! Monotonic wrapping second counter.
//!
//! Advanced by the second tick, read by the actuation guard, the store
//! staleness computation and the dispatcher. Wraps at `u32::MAX`; every
//! consumer compares instants with wrapping subtraction.

use std::sync::atomic::{AtomicU32, Ordering};

/// Seconds since power-up, modulo 2³².
#[derive(Debug, Default)]
pub struct SecondClock {
    seconds: AtomicU32,
}

impl SecondClock {
    pub const fn new(start: u32) -> Self {
        Self {
            seconds: AtomicU32::new(start),
        }
    }

    /// Current second.
    #[inline]
    pub fn now(&self) -> u32 {
        self.seconds.load(Ordering::Acquire)
    }

    /// Advance by one second and return the new value.
    #[inline]
    pub fn tick(&self) -> u32 {
        self.advance(1)
    }

    /// Advance by `seconds` and return the new value.
    pub fn advance(&self, seconds: u32) -> u32 {
        // fetch_add wraps on overflow.
        self.seconds
            .fetch_add(seconds, Ordering::AcqRel)
            .wrapping_add(seconds)
    }
}
