//! Actuation guard: dwell-time state machine for the compressor drive.
//!
//! | Current | Requested | Condition                              | Effect                  |
//! |---------|-----------|----------------------------------------|-------------------------|
//! | OFF     | ON        | bypass OR (t − last_off) > MIN_OFF     | ON, last_on = t         |
//! | ON      | OFF       | bypass OR (t − last_on) > MIN_ON       | OFF, last_off = t       |
//! | any     | same      | not evaluated                          | unchanged               |
//! | any     | denied    | n/a                                    | dropped, state unchanged|
//!
//! All interval arithmetic is wrapping 32-bit, so comparisons stay correct
//! across counter wrap for intervals shorter than 2³¹ s.
//!
//! The pure transition function is [`evaluate`]; [`ActuationGuard`] holds
//! the state in atomics so readers on other threads never block the
//! dispatcher. Only the dispatcher thread writes the guard.

use cmc_common::config::GuardConfig;
use cmc_common::consts::ELAPSED_NOT_APPLICABLE;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

// ─── Dwell configuration ────────────────────────────────────────────

/// Minimum dwell times, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellConfig {
    /// Minimum run time before switching off [s].
    pub min_on_s: u32,
    /// Minimum rest time before switching on [s].
    pub min_off_s: u32,
}

impl Default for DwellConfig {
    fn default() -> Self {
        GuardConfig::default().into()
    }
}

impl From<GuardConfig> for DwellConfig {
    fn from(config: GuardConfig) -> Self {
        Self {
            min_on_s: config.min_on_dwell_s,
            min_off_s: config.min_off_dwell_s,
        }
    }
}

// ─── Pure state machine ─────────────────────────────────────────────

/// Snapshot of the actuation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuationState {
    pub drive_on: bool,
    pub last_on_time: u32,
    pub last_off_time: u32,
    pub bypass: bool,
}

/// Result of a drive request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Transition applied, drive now `on`.
    Applied { on: bool },
    /// Requested state equals the current one.
    Unchanged,
    /// Dwell not yet elapsed. `remaining_s` until the request would pass.
    Denied { remaining_s: u32 },
}

impl GuardDecision {
    #[inline]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Decide a drive request at time `now` without mutating anything.
pub fn evaluate(
    state: &ActuationState,
    dwell: &DwellConfig,
    requested_on: bool,
    now: u32,
) -> GuardDecision {
    if requested_on == state.drive_on {
        return GuardDecision::Unchanged;
    }

    let (since, min) = if requested_on {
        (now.wrapping_sub(state.last_off_time), dwell.min_off_s)
    } else {
        (now.wrapping_sub(state.last_on_time), dwell.min_on_s)
    };

    if state.bypass || since > min {
        GuardDecision::Applied { on: requested_on }
    } else {
        GuardDecision::Denied {
            remaining_s: (min - since).saturating_add(1),
        }
    }
}

/// Apply an evaluated decision to a snapshot.
pub fn apply(state: &mut ActuationState, decision: GuardDecision, now: u32) {
    if let GuardDecision::Applied { on } = decision {
        state.drive_on = on;
        if on {
            state.last_on_time = now;
        } else {
            state.last_off_time = now;
        }
    }
}

/// Seconds since the drive switched on, or the sentinel while OFF or
/// still inside the minimum run time.
pub fn time_since_power_on(state: &ActuationState, dwell: &DwellConfig, now: u32) -> u32 {
    let since = now.wrapping_sub(state.last_on_time);
    if state.drive_on && since > dwell.min_on_s {
        since
    } else {
        ELAPSED_NOT_APPLICABLE
    }
}

/// Seconds since the drive switched off, or the sentinel while ON or
/// still inside the minimum rest time.
pub fn time_since_power_off(state: &ActuationState, dwell: &DwellConfig, now: u32) -> u32 {
    let since = now.wrapping_sub(state.last_off_time);
    if !state.drive_on && since > dwell.min_off_s {
        since
    } else {
        ELAPSED_NOT_APPLICABLE
    }
}

// ─── Shared guard ───────────────────────────────────────────────────

/// Actuation state shared between the dispatcher and readers.
///
/// Fields are independent atomics. A reader racing a transition may see
/// the new `drive_on` with the previous timestamp; elapsed-time queries
/// tolerate this since the dispatcher is the only writer.
#[derive(Debug)]
pub struct ActuationGuard {
    dwell: DwellConfig,
    drive_on: AtomicBool,
    last_on_time: AtomicU32,
    last_off_time: AtomicU32,
    bypass: AtomicBool,
}

impl ActuationGuard {
    /// Drive OFF since t = 0, bypass disabled.
    pub const fn new(dwell: DwellConfig) -> Self {
        Self {
            dwell,
            drive_on: AtomicBool::new(false),
            last_on_time: AtomicU32::new(0),
            last_off_time: AtomicU32::new(0),
            bypass: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn dwell(&self) -> DwellConfig {
        self.dwell
    }

    pub fn snapshot(&self) -> ActuationState {
        ActuationState {
            drive_on: self.drive_on.load(Ordering::Acquire),
            last_on_time: self.last_on_time.load(Ordering::Acquire),
            last_off_time: self.last_off_time.load(Ordering::Acquire),
            bypass: self.bypass.load(Ordering::Acquire),
        }
    }

    /// Evaluate and, if allowed, apply a drive request.
    pub fn request(&self, requested_on: bool, now: u32) -> GuardDecision {
        let decision = self.check(requested_on, now);
        self.commit(decision, now);
        decision
    }

    /// Decide a drive request against the current state without applying it.
    pub fn check(&self, requested_on: bool, now: u32) -> GuardDecision {
        evaluate(&self.snapshot(), &self.dwell, requested_on, now)
    }

    /// Apply a decision from [`check`](Self::check). Anything but
    /// `Applied` leaves the state untouched.
    pub fn commit(&self, decision: GuardDecision, now: u32) {
        if !decision.is_applied() {
            return;
        }
        let mut state = self.snapshot();
        apply(&mut state, decision, now);
        // Timestamps before the state flag: a reader that sees the new
        // state also sees its start time.
        self.last_on_time.store(state.last_on_time, Ordering::Release);
        self.last_off_time.store(state.last_off_time, Ordering::Release);
        self.drive_on.store(state.drive_on, Ordering::Release);
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.drive_on.load(Ordering::Acquire)
    }

    pub fn set_bypass(&self, bypass: bool) {
        self.bypass.store(bypass, Ordering::Release);
    }

    #[inline]
    pub fn bypass(&self) -> bool {
        self.bypass.load(Ordering::Acquire)
    }

    pub fn time_since_power_on(&self, now: u32) -> u32 {
        time_since_power_on(&self.snapshot(), &self.dwell, now)
    }

    pub fn time_since_power_off(&self, now: u32) -> u32 {
        time_since_power_off(&self.snapshot(), &self.dwell, now)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
