//! System-wide constants for the compressor M&C workspace.
//!
//! Single source of truth for address ranges, wire widths, default timing
//! and sentinels. Imported by all crates, never duplicated.

use crate::status::Revision;

// ─── Firmware ───────────────────────────────────────────────────────

/// Firmware revision reported on `GET_REVISION_LEVEL`.
pub const FIRMWARE_REVISION: Revision = Revision::new(1, 2, 0);

// ─── Bus addressing ─────────────────────────────────────────────────

/// Relative addresses are carried in a 21-bit field.
pub const RCA_MASK: u32 = 0x1F_FFFF;

/// First monitor RCA (`GET_TEMP_1`).
pub const FIRST_MONITOR_RCA: u32 = 0x00001;

/// Last monitor RCA (`GET_BACKING_PUMP_STATE`).
pub const LAST_MONITOR_RCA: u32 = 0x00014;

/// First control RCA (`SET_REMOTE_DRIVE`).
pub const FIRST_CONTROL_RCA: u32 = 0x01001;

/// Last control RCA of the control block. Unassigned addresses are inert.
pub const LAST_CONTROL_RCA: u32 = 0x0100F;

/// Diagnostic control address (`SET_GUARD_BYPASS`).
pub const DIAGNOSTIC_RCA: u32 = 0x02000;

/// Maximum payload carried by a single bus message.
pub const MAX_PAYLOAD: usize = 8;

// ─── Wire widths ────────────────────────────────────────────────────

/// Flags and enumerations.
pub const BYTE_LEN: u8 = 1;

/// major.minor.patch triple.
pub const REVISION_LEN: u8 = 3;

/// IEEE-754 single precision and 32-bit unsigned.
pub const FLOAT_LEN: u8 = 4;

// ─── Actuation guard ────────────────────────────────────────────────

/// Default minimum run time before the compressor may be switched off [s].
pub const MIN_ON_DWELL_S_DEFAULT: u32 = 180;

/// Default minimum rest time before the compressor may be switched on [s].
pub const MIN_OFF_DWELL_S_DEFAULT: u32 = 300;

/// Exclusive upper bound for configured dwell times [s]: 2³¹.
pub const MAX_DWELL_S: u32 = 1 << 31;

/// Elapsed-time sentinel: "not applicable" while still inside a dwell.
pub const ELAPSED_NOT_APPLICABLE: u32 = u32::MAX;

// ─── Staleness ──────────────────────────────────────────────────────

/// Saturated age in minutes. Also reported for never-updated points.
pub const AGE_SENTINEL_MINUTES: u8 = u8::MAX;

// ─── Timing ─────────────────────────────────────────────────────────

/// Monotonic clock resolution [ms].
pub const SECOND_TICK_MS_DEFAULT: u64 = 1000;

/// Acquisition tick period [ms]. Shorter than the second tick.
pub const ACQUISITION_PERIOD_MS_DEFAULT: u64 = 250;

/// Minimum spacing between two report lines [ms].
pub const REPORT_SPACING_MS_DEFAULT: u64 = 500;

// ─── Transport ──────────────────────────────────────────────────────

/// Size of the serial transmit buffer [bytes].
pub const SER_TX_BUF_SIZE: usize = 80;

/// Serial line rate used to model transmission time.
pub const SER_BAUD_DEFAULT: u32 = 19_200;

/// Line feed.
pub const LF: u8 = 0x0A;

/// Carriage return.
pub const CR: u8 = 0x0D;

// ─── Facility registry ──────────────────────────────────────────────

/// Maximum number of facilities, including the registry itself.
pub const MAX_FACILITIES: usize = 8;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cmc/node.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_ranges_are_disjoint() {
        assert!(LAST_MONITOR_RCA < FIRST_CONTROL_RCA);
        assert!(LAST_CONTROL_RCA < DIAGNOSTIC_RCA);
        assert!(DIAGNOSTIC_RCA <= RCA_MASK);
    }

    #[test]
    fn acquisition_is_faster_than_second_tick() {
        assert!(ACQUISITION_PERIOD_MS_DEFAULT < SECOND_TICK_MS_DEFAULT);
    }

    #[test]
    fn wire_widths_fit_payload() {
        for len in [BYTE_LEN, REVISION_LEN, FLOAT_LEN] {
            assert!(len as usize <= MAX_PAYLOAD);
        }
    }
}
