//! Bus message and address-space types.
//!
//! A request arrives as a [`BusMessage`] carrying a relative address (RCA),
//! a direction and up to [`MAX_PAYLOAD`] data bytes. The response is written
//! back into the same message; fields the handler does not touch keep the
//! default supplied by the transport.

use core::fmt;

use crate::consts::{
    DIAGNOSTIC_RCA, FIRST_CONTROL_RCA, FIRST_MONITOR_RCA, LAST_CONTROL_RCA, LAST_MONITOR_RCA,
    MAX_PAYLOAD, RCA_MASK,
};
use crate::status::{StatusId, ValueKind};

// ─── Direction ──────────────────────────────────────────────────────

/// Message direction as seen from the bus master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Read request (monitor).
    Query,
    /// Write request (control).
    Command,
}

// ─── BusMessage ─────────────────────────────────────────────────────

/// One request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusMessage {
    /// Relative address within the node.
    pub relative_address: u32,
    /// Request direction.
    pub direction: Direction,
    /// Payload bytes; only the first `len` are meaningful.
    pub data: [u8; MAX_PAYLOAD],
    /// Payload length.
    pub len: u8,
}

impl BusMessage {
    /// A query with an empty payload.
    pub const fn query(relative_address: u32) -> Self {
        Self {
            relative_address,
            direction: Direction::Query,
            data: [0; MAX_PAYLOAD],
            len: 0,
        }
    }

    /// A command carrying `payload` (truncated to [`MAX_PAYLOAD`]).
    pub fn command(relative_address: u32, payload: &[u8]) -> Self {
        let mut data = [0u8; MAX_PAYLOAD];
        let len = payload.len().min(MAX_PAYLOAD);
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            relative_address,
            direction: Direction::Command,
            data,
            len: len as u8,
        }
    }

    /// Meaningful payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(MAX_PAYLOAD)]
    }
}

impl fmt::Display for BusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:05X} len={}", self.relative_address, self.len)?;
        for b in self.payload() {
            write!(f, " {b:02x}")?;
        }
        Ok(())
    }
}

// ─── ControlPoint ───────────────────────────────────────────────────

/// Number of assigned control addresses, including the diagnostic one.
pub const CONTROL_POINT_COUNT: usize = 8;

/// Assigned control addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControlPoint {
    /// Switch the compressor drive on (non-zero) or off (zero).
    SetRemoteDrive = 0,
    /// Pulse the compressor reset line.
    SetRemoteReset = 1,
    /// Push the cryostat 4 K stage temperature.
    SetCryo4kTemperature = 2,
    /// Push the cryostat 15 K stage temperature.
    SetCryo15kTemperature = 3,
    /// Push the cryostat vacuum.
    SetCryostatPressure = 4,
    /// Push the gate valve state.
    SetGateValveState = 5,
    /// Push the backing pump state.
    SetBackingPumpState = 6,
    /// Diagnostic: disable dwell-time enforcement (non-zero) or restore it.
    SetGuardBypass = 7,
}

impl ControlPoint {
    /// All control points, indexable by discriminant.
    pub const ALL: [ControlPoint; CONTROL_POINT_COUNT] = [
        Self::SetRemoteDrive,
        Self::SetRemoteReset,
        Self::SetCryo4kTemperature,
        Self::SetCryo15kTemperature,
        Self::SetCryostatPressure,
        Self::SetGateValveState,
        Self::SetBackingPumpState,
        Self::SetGuardBypass,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Control RCA of this point.
    pub const fn rca(self) -> u32 {
        match self {
            Self::SetGuardBypass => DIAGNOSTIC_RCA,
            other => FIRST_CONTROL_RCA + other as u32,
        }
    }

    /// Resolve an RCA inside the control block or the diagnostic address.
    pub const fn from_rca(rca: u32) -> Option<Self> {
        match rca {
            0x01001 => Some(Self::SetRemoteDrive),
            0x01002 => Some(Self::SetRemoteReset),
            0x01003 => Some(Self::SetCryo4kTemperature),
            0x01004 => Some(Self::SetCryo15kTemperature),
            0x01005 => Some(Self::SetCryostatPressure),
            0x01006 => Some(Self::SetGateValveState),
            0x01007 => Some(Self::SetBackingPumpState),
            DIAGNOSTIC_RCA => Some(Self::SetGuardBypass),
            _ => None,
        }
    }

    /// Status point written by a push command, if any.
    pub const fn pushed_point(self) -> Option<StatusId> {
        match self {
            Self::SetCryo4kTemperature => Some(StatusId::Cryo4kTemperature),
            Self::SetCryo15kTemperature => Some(StatusId::Cryo15kTemperature),
            Self::SetCryostatPressure => Some(StatusId::CryostatPressure),
            Self::SetGateValveState => Some(StatusId::GateValveState),
            Self::SetBackingPumpState => Some(StatusId::BackingPumpState),
            _ => None,
        }
    }

    /// Payload type expected by this address.
    pub const fn kind(self) -> ValueKind {
        match self.pushed_point() {
            Some(id) => id.kind(),
            None => ValueKind::Byte,
        }
    }

    /// Whether this is the diagnostic address.
    #[inline]
    pub const fn is_diagnostic(self) -> bool {
        matches!(self, Self::SetGuardBypass)
    }
}

// ─── Address classification ─────────────────────────────────────────

/// Where a relative address lands in the node's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    /// Inside the monitor range.
    Monitor(StatusId),
    /// An assigned control address (control block or diagnostic).
    Control(ControlPoint),
    /// Inside the control block but unassigned.
    ReservedControl,
    /// Outside every range.
    Inert,
}

/// Classify a raw relative address.
pub const fn classify(relative_address: u32) -> AddressClass {
    if relative_address & !RCA_MASK != 0 {
        return AddressClass::Inert;
    }
    if relative_address >= FIRST_MONITOR_RCA && relative_address <= LAST_MONITOR_RCA {
        return match StatusId::from_rca(relative_address) {
            Some(id) => AddressClass::Monitor(id),
            None => AddressClass::Inert,
        };
    }
    match ControlPoint::from_rca(relative_address) {
        Some(point) => AddressClass::Control(point),
        None if relative_address >= FIRST_CONTROL_RCA && relative_address <= LAST_CONTROL_RCA => {
            AddressClass::ReservedControl
        }
        None => AddressClass::Inert,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_rca_round_trip() {
        for point in ControlPoint::ALL {
            assert_eq!(ControlPoint::from_rca(point.rca()), Some(point));
            assert_eq!(ControlPoint::ALL[point.index()], point);
        }
    }

    #[test]
    fn classify_ranges() {
        assert_eq!(classify(0x00001), AddressClass::Monitor(StatusId::Temp1));
        assert_eq!(classify(0x00014), AddressClass::Monitor(StatusId::BackingPumpState));
        assert_eq!(classify(0x00015), AddressClass::Inert);
        assert_eq!(classify(0x00000), AddressClass::Inert);
        assert_eq!(classify(0x01001), AddressClass::Control(ControlPoint::SetRemoteDrive));
        assert_eq!(classify(0x0100F), AddressClass::ReservedControl);
        assert_eq!(classify(0x01010), AddressClass::Inert);
        assert_eq!(classify(0x02000), AddressClass::Control(ControlPoint::SetGuardBypass));
        assert_eq!(classify(0x30003), AddressClass::Inert);
    }

    #[test]
    fn addresses_wider_than_21_bits_are_inert() {
        assert_eq!(classify(0x0020_0001), AddressClass::Inert);
        assert_eq!(classify(0x8000_1001), AddressClass::Inert);
    }

    #[test]
    fn push_widths_follow_target_point() {
        assert_eq!(ControlPoint::SetCryo4kTemperature.kind().wire_len(), 4);
        assert_eq!(ControlPoint::SetGateValveState.kind().wire_len(), 1);
        assert_eq!(ControlPoint::SetRemoteDrive.kind().wire_len(), 1);
        assert_eq!(ControlPoint::SetGuardBypass.kind().wire_len(), 1);
    }

    #[test]
    fn command_truncates_long_payload() {
        let msg = BusMessage::command(0x01001, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(msg.len, 8);
        assert_eq!(msg.payload(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn display_shows_address_and_bytes() {
        let msg = BusMessage::command(0x01001, &[0x01]);
        assert_eq!(msg.to_string(), "0x01001 len=1 01");
    }
}
