//! State shared by every node thread.

use cmc_common::consts::FIRMWARE_REVISION;
use cmc_common::status::{StatusId, StatusValue};

use crate::clock::SecondClock;
use crate::guard::{ActuationGuard, DwellConfig};
use crate::store::StatusStore;

/// Clock, status store and actuation guard, shared through `Arc`.
#[derive(Debug)]
pub struct NodeState {
    pub clock: SecondClock,
    pub store: StatusStore,
    pub guard: ActuationGuard,
}

impl NodeState {
    /// Fresh state at t = 0 with the constant and actuation points written.
    pub fn new(dwell: DwellConfig) -> Self {
        let state = Self {
            clock: SecondClock::new(0),
            store: StatusStore::new(),
            guard: ActuationGuard::new(dwell),
        };
        state
            .store
            .update(StatusId::RevisionLevel, StatusValue::Revision(FIRMWARE_REVISION), 0);
        state.store.update(StatusId::DriveState, StatusValue::Byte(0), 0);
        state
    }

    /// Current second.
    #[inline]
    pub fn now(&self) -> u32 {
        self.clock.now()
    }

    /// Value and age of a point at `now`.
    ///
    /// Elapsed-time points are derived from the guard on every read and are
    /// always fresh.
    pub fn read_point(&self, id: StatusId, now: u32) -> (StatusValue, u8) {
        match id {
            StatusId::TimeSincePowerOn => {
                (StatusValue::Unsigned(self.guard.time_since_power_on(now)), 0)
            }
            StatusId::TimeSincePowerOff => {
                (StatusValue::Unsigned(self.guard.time_since_power_off(now)), 0)
            }
            _ => self.store.read(id, now),
        }
    }
}
