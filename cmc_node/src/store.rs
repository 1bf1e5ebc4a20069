//! Status store.
//!
//! One cell per [`StatusId`], laid out as a fixed array indexed by the id's
//! discriminant. Each cell is three independent atomics (value bits,
//! timestamp, updated marker) and there is no per-cell lock.
//!
//! ## Consistency
//!
//! Value and timestamp are stored separately. A reader racing a writer may
//! observe the new value with the previous timestamp, or the previous value
//! with the new timestamp. Each field on its own is never torn. Callers
//! accept the resulting off-by-one-update age; the store is single writer
//! per cell by convention (acquisition tick for sensor points, dispatcher
//! for pushed and actuation points).

use cmc_common::consts::AGE_SENTINEL_MINUTES;
use cmc_common::status::{STATUS_POINT_COUNT, StatusId, StatusValue};
use static_assertions::const_assert_eq;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

const_assert_eq!(StatusId::ALL.len(), STATUS_POINT_COUNT);

/// Seconds per age unit.
const SECONDS_PER_MINUTE: u32 = 60;

/// Whole minutes between `last_update` and `now`, saturated at 255.
///
/// `None` (never updated) yields the saturated value.
#[inline]
pub fn age_minutes(now: u32, last_update: Option<u32>) -> u8 {
    match last_update {
        Some(at) => {
            let minutes = now.wrapping_sub(at) / SECONDS_PER_MINUTE;
            minutes.min(AGE_SENTINEL_MINUTES as u32) as u8
        }
        None => AGE_SENTINEL_MINUTES,
    }
}

#[derive(Debug)]
struct StatusCell {
    bits: AtomicU32,
    stamp: AtomicU32,
    updated: AtomicBool,
}

impl StatusCell {
    const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
            stamp: AtomicU32::new(0),
            updated: AtomicBool::new(false),
        }
    }
}

/// Latest value and update time of every status point.
#[derive(Debug)]
pub struct StatusStore {
    cells: [StatusCell; STATUS_POINT_COUNT],
}

impl StatusStore {
    /// All points zero-valued, never updated.
    pub const fn new() -> Self {
        Self {
            cells: [const { StatusCell::new() }; STATUS_POINT_COUNT],
        }
    }

    /// Overwrite value and timestamp. No range validation.
    pub fn update(&self, id: StatusId, value: StatusValue, at: u32) {
        debug_assert_eq!(value.kind(), id.kind(), "{id} written with wrong kind");
        let cell = &self.cells[id.index()];
        cell.bits.store(value.to_bits(), Ordering::Release);
        cell.stamp.store(at, Ordering::Release);
        cell.updated.store(true, Ordering::Release);
    }

    /// Current value.
    #[inline]
    pub fn value(&self, id: StatusId) -> StatusValue {
        let bits = self.cells[id.index()].bits.load(Ordering::Acquire);
        StatusValue::from_bits(id.kind(), bits)
    }

    /// Timestamp of the last update, `None` if never updated.
    #[inline]
    pub fn last_update(&self, id: StatusId) -> Option<u32> {
        let cell = &self.cells[id.index()];
        if cell.updated.load(Ordering::Acquire) {
            Some(cell.stamp.load(Ordering::Acquire))
        } else {
            None
        }
    }

    /// Value and age in whole minutes at `now`.
    pub fn read(&self, id: StatusId, now: u32) -> (StatusValue, u8) {
        let value = self.value(id);
        (value, age_minutes(now, self.last_update(id)))
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use cmc_common::status::{Revision, ValueKind};
    use proptest::prelude::*;

    fn sample_value(id: StatusId, seed: u32) -> StatusValue {
        match id.kind() {
            ValueKind::Byte => StatusValue::Byte(seed as u8),
            ValueKind::Float => StatusValue::Float(seed as f32 * 0.5),
            ValueKind::Unsigned => StatusValue::Unsigned(seed),
            ValueKind::Revision => StatusValue::Revision(Revision::new(1, seed as u8, 0)),
        }
    }

    #[test]
    fn fresh_store_is_zero_and_never_updated() {
        let store = StatusStore::new();
        for id in StatusId::ALL {
            let (value, age) = store.read(id, 0);
            assert_eq!(value, StatusValue::zero(id.kind()));
            assert_eq!(age, AGE_SENTINEL_MINUTES);
            assert_eq!(store.last_update(id), None);
        }
    }

    #[test]
    fn read_right_after_update_has_age_zero() {
        let store = StatusStore::new();
        for (i, id) in StatusId::ALL.into_iter().enumerate() {
            let v = sample_value(id, i as u32 + 1);
            store.update(id, v, 1000);
            assert_eq!(store.read(id, 1000), (v, 0));
        }
    }

    #[test]
    fn age_counts_whole_minutes() {
        let store = StatusStore::new();
        store.update(StatusId::Temp1, StatusValue::Float(1.0), 100);
        assert_eq!(store.read(StatusId::Temp1, 159).1, 0);
        assert_eq!(store.read(StatusId::Temp1, 160).1, 1);
        assert_eq!(store.read(StatusId::Temp1, 100 + 60 * 255).1, 255);
        assert_eq!(store.read(StatusId::Temp1, 100 + 60 * 1000).1, 255);
    }

    #[test]
    fn age_is_wrap_safe() {
        assert_eq!(age_minutes(59, Some(u32::MAX - 60)), 2);
    }

    #[test]
    fn update_is_per_point() {
        let store = StatusStore::new();
        store.update(StatusId::Aux1, StatusValue::Float(2.5), 10);
        assert_eq!(store.last_update(StatusId::Aux2), None);
        assert_eq!(store.value(StatusId::Aux1), StatusValue::Float(2.5));
    }

    proptest! {
        #[test]
        fn age_matches_division(t1 in any::<u32>(), dt in 0u32..(60 * 400)) {
            let store = StatusStore::new();
            store.update(StatusId::Pressure, StatusValue::Float(0.5), t1);
            let t2 = t1.wrapping_add(dt);
            let expected = (dt / 60).min(255) as u8;
            prop_assert_eq!(store.read(StatusId::Pressure, t2).1, expected);
        }
    }
}
