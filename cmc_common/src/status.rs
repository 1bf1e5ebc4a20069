//! Status point identifiers and typed values.
//!
//! `StatusId` is a closed, dense enumeration: discriminant `i` is both the
//! store index and monitor RCA `FIRST_MONITOR_RCA + i`. Density is checked
//! at compile time so the store can be a plain fixed-size array.

use core::fmt;

use static_assertions::{const_assert, const_assert_eq};

use crate::consts::{BYTE_LEN, FIRST_MONITOR_RCA, FLOAT_LEN, LAST_MONITOR_RCA, REVISION_LEN};

// ─── StatusId ───────────────────────────────────────────────────────

/// Number of status points held by the store.
pub const STATUS_POINT_COUNT: usize = 20;

/// Every monitored or latched quantity of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum StatusId {
    /// Compressor temperature 1 [°C].
    Temp1 = 0,
    /// Compressor temperature 2 [°C].
    Temp2 = 1,
    /// Compressor temperature 3 [°C].
    Temp3 = 2,
    /// Compressor temperature 4 [°C].
    Temp4 = 3,
    /// Auxiliary analog input 1 [V].
    Aux1 = 4,
    /// Auxiliary analog input 2 [V].
    Aux2 = 5,
    /// Helium return pressure [MPa].
    Pressure = 6,
    /// Pressure alarm (1 = alarm).
    PressureAlarm = 7,
    /// Temperature alarm (1 = alarm).
    TemperatureAlarm = 8,
    /// Drive indication as reported by the compressor.
    DriveIndication = 9,
    /// Firmware revision.
    RevisionLevel = 10,
    /// Ambient temperature from the one-wire sensor [°C].
    AmbientTemperature = 11,
    /// Effective drive state applied by the actuation guard.
    DriveState = 12,
    /// Seconds since the drive was switched on.
    TimeSincePowerOn = 13,
    /// Seconds since the drive was switched off.
    TimeSincePowerOff = 14,
    /// Cryostat 4 K stage temperature [K], pushed upstream.
    Cryo4kTemperature = 15,
    /// Cryostat 15 K stage temperature [K], pushed upstream.
    Cryo15kTemperature = 16,
    /// Cryostat vacuum [mbar], pushed upstream.
    CryostatPressure = 17,
    /// Cryostat gate valve state, pushed upstream.
    GateValveState = 18,
    /// Backing pump state, pushed upstream.
    BackingPumpState = 19,
}

/// Which subsystem feeds a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointGroup {
    /// Measured or derived on this node.
    Local,
    /// Written by an upstream subsystem through control requests.
    Pushed,
}

/// Who writes a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointSource {
    /// Acquisition tick (analog channels, digital lines, one-wire sensor).
    Sensor,
    /// Written once at start.
    Constant,
    /// Derived from the actuation guard.
    Actuation,
    /// Push-control requests.
    Pushed,
}

impl StatusId {
    /// All ids in enumeration (and reporting) order.
    pub const ALL: [StatusId; STATUS_POINT_COUNT] = [
        Self::Temp1,
        Self::Temp2,
        Self::Temp3,
        Self::Temp4,
        Self::Aux1,
        Self::Aux2,
        Self::Pressure,
        Self::PressureAlarm,
        Self::TemperatureAlarm,
        Self::DriveIndication,
        Self::RevisionLevel,
        Self::AmbientTemperature,
        Self::DriveState,
        Self::TimeSincePowerOn,
        Self::TimeSincePowerOff,
        Self::Cryo4kTemperature,
        Self::Cryo15kTemperature,
        Self::CryostatPressure,
        Self::GateValveState,
        Self::BackingPumpState,
    ];

    /// Store index.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`index`](Self::index).
    #[inline]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < STATUS_POINT_COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Monitor RCA answering this point.
    #[inline]
    pub const fn rca(self) -> u32 {
        FIRST_MONITOR_RCA + self as u32
    }

    /// Resolve a monitor RCA. Returns `None` outside the monitor range.
    #[inline]
    pub const fn from_rca(rca: u32) -> Option<Self> {
        if rca < FIRST_MONITOR_RCA || rca > LAST_MONITOR_RCA {
            return None;
        }
        Self::from_index((rca - FIRST_MONITOR_RCA) as usize)
    }

    /// Value type stored for this point.
    pub const fn kind(self) -> ValueKind {
        use StatusId::*;
        match self {
            Temp1 | Temp2 | Temp3 | Temp4 | Aux1 | Aux2 | Pressure | AmbientTemperature
            | Cryo4kTemperature | Cryo15kTemperature | CryostatPressure => ValueKind::Float,
            PressureAlarm | TemperatureAlarm | DriveIndication | DriveState | GateValveState
            | BackingPumpState => ValueKind::Byte,
            TimeSincePowerOn | TimeSincePowerOff => ValueKind::Unsigned,
            RevisionLevel => ValueKind::Revision,
        }
    }

    /// Logical partition of the store.
    pub const fn group(self) -> PointGroup {
        match self.source() {
            PointSource::Pushed => PointGroup::Pushed,
            _ => PointGroup::Local,
        }
    }

    /// Writer of this point.
    pub const fn source(self) -> PointSource {
        use StatusId::*;
        match self {
            RevisionLevel => PointSource::Constant,
            DriveState | TimeSincePowerOn | TimeSincePowerOff => PointSource::Actuation,
            Cryo4kTemperature | Cryo15kTemperature | CryostatPressure | GateValveState
            | BackingPumpState => PointSource::Pushed,
            _ => PointSource::Sensor,
        }
    }

    /// Short uppercase label used in report lines and logs.
    pub const fn label(self) -> &'static str {
        use StatusId::*;
        match self {
            Temp1 => "TEMP_1",
            Temp2 => "TEMP_2",
            Temp3 => "TEMP_3",
            Temp4 => "TEMP_4",
            Aux1 => "AUX_1",
            Aux2 => "AUX_2",
            Pressure => "PRESSURE",
            PressureAlarm => "PRESSURE_ALARM",
            TemperatureAlarm => "TEMP_ALARM",
            DriveIndication => "DRIVE_INDICATION",
            RevisionLevel => "REVISION_LEVEL",
            AmbientTemperature => "AMBIENT_TEMP",
            DriveState => "DRIVE_STATE",
            TimeSincePowerOn => "TIME_SINCE_ON",
            TimeSincePowerOff => "TIME_SINCE_OFF",
            Cryo4kTemperature => "CRYO_4K_TEMP",
            Cryo15kTemperature => "CRYO_15K_TEMP",
            CryostatPressure => "CRYO_PRESSURE",
            GateValveState => "GATE_VALVE",
            BackingPumpState => "BACKING_PUMP",
        }
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const fn ids_are_dense() -> bool {
    let mut i = 0;
    while i < STATUS_POINT_COUNT {
        if StatusId::ALL[i] as usize != i {
            return false;
        }
        i += 1;
    }
    true
}

const_assert!(ids_are_dense());
const_assert_eq!(
    STATUS_POINT_COUNT as u32,
    LAST_MONITOR_RCA - FIRST_MONITOR_RCA + 1
);

// ─── Values ─────────────────────────────────────────────────────────

/// Wire type of a status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Byte,
    Float,
    Unsigned,
    Revision,
}

impl ValueKind {
    /// Number of payload bytes on the bus.
    #[inline]
    pub const fn wire_len(self) -> u8 {
        match self {
            Self::Byte => BYTE_LEN,
            Self::Float | Self::Unsigned => FLOAT_LEN,
            Self::Revision => REVISION_LEN,
        }
    }
}

/// major.minor.patch revision triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Revision {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Revision {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Typed value of a status point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusValue {
    Byte(u8),
    Float(f32),
    Unsigned(u32),
    Revision(Revision),
}

impl StatusValue {
    /// Zero value of the given kind (state of a point at start).
    pub const fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Byte => Self::Byte(0),
            ValueKind::Float => Self::Float(0.0),
            ValueKind::Unsigned => Self::Unsigned(0),
            ValueKind::Revision => Self::Revision(Revision::new(0, 0, 0)),
        }
    }

    #[inline]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Byte(_) => ValueKind::Byte,
            Self::Float(_) => ValueKind::Float,
            Self::Unsigned(_) => ValueKind::Unsigned,
            Self::Revision(_) => ValueKind::Revision,
        }
    }

    /// Pack into a single 32-bit cell.
    pub fn to_bits(&self) -> u32 {
        match *self {
            Self::Byte(b) => b as u32,
            Self::Float(v) => v.to_bits(),
            Self::Unsigned(v) => v,
            Self::Revision(r) => {
                ((r.major as u32) << 16) | ((r.minor as u32) << 8) | r.patch as u32
            }
        }
    }

    /// Unpack a cell written by [`to_bits`](Self::to_bits).
    pub fn from_bits(kind: ValueKind, bits: u32) -> Self {
        match kind {
            ValueKind::Byte => Self::Byte(bits as u8),
            ValueKind::Float => Self::Float(f32::from_bits(bits)),
            ValueKind::Unsigned => Self::Unsigned(bits),
            ValueKind::Revision => Self::Revision(Revision::new(
                (bits >> 16) as u8,
                (bits >> 8) as u8,
                bits as u8,
            )),
        }
    }

    /// Serialize big-endian into `out`, returning the wire length.
    ///
    /// Byte order does not depend on the host.
    pub fn encode(&self, out: &mut [u8]) -> u8 {
        let len = self.kind().wire_len();
        match *self {
            Self::Byte(b) => out[0] = b,
            Self::Float(v) => out[..4].copy_from_slice(&v.to_be_bytes()),
            Self::Unsigned(v) => out[..4].copy_from_slice(&v.to_be_bytes()),
            Self::Revision(r) => out[..3].copy_from_slice(&[r.major, r.minor, r.patch]),
        }
        len
    }

    /// Decode a big-endian payload of the given kind.
    ///
    /// Returns `None` when `data` is shorter than the wire width. Extra
    /// trailing bytes are ignored.
    pub fn decode(kind: ValueKind, data: &[u8]) -> Option<Self> {
        let len = kind.wire_len() as usize;
        if data.len() < len {
            return None;
        }
        let value = match kind {
            ValueKind::Byte => Self::Byte(data[0]),
            ValueKind::Float => Self::Float(f32::from_be_bytes([data[0], data[1], data[2], data[3]])),
            ValueKind::Unsigned => {
                Self::Unsigned(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
            }
            ValueKind::Revision => Self::Revision(Revision::new(data[0], data[1], data[2])),
        };
        Some(value)
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(b) => write!(f, "{b}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Revision(r) => write!(f, "{r}"),
        }
    }
}

// ─── Enumerated states ──────────────────────────────────────────────

/// Cryostat gate valve position, as pushed by the cryostat controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValveState {
    Closed = 0,
    Open = 1,
    Moving = 2,
    Fault = 3,
}

impl ValveState {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Closed),
            1 => Some(Self::Open),
            2 => Some(Self::Moving),
            3 => Some(Self::Fault),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::Moving => "MOVING",
            Self::Fault => "FAULT",
        }
    }
}

/// Backing pump state, as pushed by the cryostat controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PumpState {
    Off = 0,
    On = 1,
    Fault = 2,
}

impl PumpState {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::On),
            2 => Some(Self::Fault),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
            Self::Fault => "FAULT",
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
