//! Collaborator interfaces of the node.
//!
//! The node core talks to hardware only through three traits:
//!
//! - [`AcquisitionSource`] - analog channels, digital status lines and the
//!   one-wire ambient sensor
//! - [`DriveOutputs`] - remote drive and remote reset lines
//! - [`Transport`] - serial transmit path used by the reporting cadence
//!
//! Implementations live in `cmc_hal` and are selected by name through its
//! driver registry.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::facility::FacilityCode;

// ─── Errors ─────────────────────────────────────────────────────────

/// Error types for collaborator operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HalError {
    /// Analog channel above [`MAX_ANALOG_CHANNEL`].
    #[error("Analog channel {0} out of range")]
    ChannelOutOfRange(u8),

    /// One-wire sensor did not answer the presence pulse.
    #[error("Temperature sensor not present")]
    SensorAbsent,

    /// One-wire scratchpad failed its CRC.
    #[error("Temperature sensor CRC mismatch")]
    SensorCrc,

    /// Payload larger than the transmit buffer.
    #[error("Transmit overrun: {len} bytes")]
    TxOverrun { len: usize },

    /// Transmit requested while a previous line is still going out.
    #[error("Transport busy")]
    TransportBusy,

    /// An output line did not switch.
    #[error("Output line {0} failed")]
    OutputFailed(&'static str),

    /// Driver initialization failed.
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Driver not found in the registry.
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

// ─── Analog acquisition ─────────────────────────────────────────────

/// Highest analog channel the converter accepts.
pub const MAX_ANALOG_CHANNEL: u8 = 0x0F;

/// Compressor temperature channels, 0-5 V for -30..60 °C.
pub const TEMP_CHANNELS: [u8; 4] = [8, 9, 10, 11];

/// Auxiliary input channels, reported in volts.
pub const AUX_CHANNELS: [u8; 2] = [12, 13];

/// Helium return pressure channel.
pub const PRESSURE_CHANNEL: u8 = 14;

/// `Err(ChannelOutOfRange)` above [`MAX_ANALOG_CHANNEL`].
#[inline]
pub fn check_channel(channel: u8) -> Result<(), HalError> {
    if channel > MAX_ANALOG_CHANNEL {
        return Err(HalError::ChannelOutOfRange(channel));
    }
    Ok(())
}

/// Facility name of the analog converter in the error registry.
pub const ADC_FACILITY: &str = "ADC";

/// Error table of the analog converter facility.
pub const ADC_CODES: &[FacilityCode] = &[
    FacilityCode::new(0, "NoEr"),
    FacilityCode::new(AdcFault::ChannelOutOfRange as u8, "ChOR"),
    FacilityCode::new(AdcFault::ModeOutOfRange as u8, "MdOR"),
    FacilityCode::new(AdcFault::ConversionTimeOutOfRange as u8, "CROR"),
];

/// Facility name of the one-wire ambient sensor.
pub const SENSOR_FACILITY: &str = "OWS";

/// Error table of the one-wire sensor facility.
pub const SENSOR_CODES: &[FacilityCode] = &[
    FacilityCode::new(0, "NoEr"),
    FacilityCode::new(1, "NDev"),
    FacilityCode::new(2, "CRCE"),
];

/// Analog converter fault codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdcFault {
    ChannelOutOfRange = 1,
    ModeOutOfRange = 2,
    ConversionTimeOutOfRange = 3,
}

impl AdcFault {
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Converter setup as written in the `[adc]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcSetup {
    /// Operation mode, 0..=3.
    pub mode: u8,
    /// Conversion time selector, 0..=0xF.
    pub conversion_time: u8,
}

/// Validated converter timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcTiming {
    pub mode: u8,
    /// Sample time control bits.
    pub sample_control: u8,
    /// Conversion time control bits.
    pub conversion_control: u8,
}

/// `(sample_control, conversion_control)` per conversion time selector.
const CONVERSION_TABLE: [(u8, u8); 16] = [
    (0, 1),
    (1, 1),
    (2, 1),
    (0, 0),
    (3, 1),
    (1, 0),
    (2, 0),
    (0, 3),
    (3, 0),
    (1, 3),
    (2, 3),
    (0, 2),
    (3, 3),
    (1, 2),
    (2, 2),
    (3, 2),
];

impl AdcSetup {
    pub const MAX_MODE: u8 = 0x03;
    pub const MAX_CONVERSION_TIME: u8 = 0x0F;

    /// Range-check the setup and resolve the timing bits.
    pub fn validate(&self) -> Result<AdcTiming, AdcFault> {
        if self.mode > Self::MAX_MODE {
            return Err(AdcFault::ModeOutOfRange);
        }
        if self.conversion_time > Self::MAX_CONVERSION_TIME {
            return Err(AdcFault::ConversionTimeOutOfRange);
        }
        let (sample_control, conversion_control) =
            CONVERSION_TABLE[self.conversion_time as usize];
        Ok(AdcTiming {
            mode: self.mode,
            sample_control,
            conversion_control,
        })
    }
}

// ─── Digital lines ──────────────────────────────────────────────────

/// Digital status inputs wired from the compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitalLine {
    /// Active low.
    PressureAlarm,
    /// Active low.
    TemperatureAlarm,
    /// HIGH while the compressor reports its drive off.
    DriveIndication,
}

/// Number of digital status lines.
pub const DIGITAL_LINE_COUNT: usize = 3;

impl DigitalLine {
    pub const ALL: [DigitalLine; DIGITAL_LINE_COUNT] = [
        Self::PressureAlarm,
        Self::TemperatureAlarm,
        Self::DriveIndication,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Electrical level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineLevel {
    Low,
    #[default]
    High,
}

impl LineLevel {
    #[inline]
    pub const fn is_low(self) -> bool {
        matches!(self, Self::Low)
    }

    #[inline]
    pub const fn from_high(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

// ─── One-wire ambient sensor ────────────────────────────────────────

/// Raw DS1820 scratchpad fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemperatureReading {
    /// Temperature LSB, half-degree resolution.
    pub int_part: u8,
    /// COUNT_REMAIN register.
    pub frac_part: u8,
    /// Temperature MSB: 0x00 positive, 0xFF negative.
    pub sign: u8,
    /// COUNT_PER_C register.
    pub scale: u8,
}

impl TemperatureReading {
    /// Extended-resolution temperature [°C]. `None` when `scale` is zero.
    pub fn celsius(&self) -> Option<f32> {
        if self.scale == 0 {
            return None;
        }
        let raw = i16::from_be_bytes([self.sign, self.int_part]);
        let whole = (raw >> 1) as f32;
        let scale = self.scale as f32;
        Some(whole - 0.25 + (scale - self.frac_part as f32) / scale)
    }

    /// Scratchpad fields that read back as `celsius` (1/16 °C resolution).
    pub fn from_celsius(celsius: f32) -> Self {
        const COUNT_PER_C: u8 = 16;

        let mut whole = celsius.floor();
        let mut frac = celsius - whole;
        if frac > 0.75 {
            whole += 1.0;
            frac -= 1.0;
        }
        let remain = (12.0 - frac * COUNT_PER_C as f32)
            .round()
            .clamp(0.0, COUNT_PER_C as f32) as u8;
        let raw = (whole as i16).wrapping_mul(2);
        let [sign, int_part] = raw.to_be_bytes();
        Self {
            int_part,
            frac_part: remain,
            sign,
            scale: COUNT_PER_C,
        }
    }
}

// ─── Transport ──────────────────────────────────────────────────────

bitflags! {
    /// Serial transmit status.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TransportStatus: u8 {
        /// A line is being transmitted.
        const TX_BUSY    = 0x01;
        /// The last transmit request did not fit the buffer.
        const TX_OVERRUN = 0x04;
    }
}

// ─── Collaborator traits ────────────────────────────────────────────

/// Sensor side of the node.
///
/// Called from the acquisition tick only; implementations may block for
/// the duration of one conversion but never longer.
pub trait AcquisitionSource: Send {
    /// Driver identifier (e.g. "simulation").
    fn name(&self) -> &'static str;

    /// Apply converter timing. Called once before the first sample.
    fn configure(&mut self, timing: &AdcTiming) -> Result<(), HalError>;

    /// Convert one analog channel to volts.
    ///
    /// # Errors
    /// `ChannelOutOfRange` above [`MAX_ANALOG_CHANNEL`].
    fn sample(&mut self, channel: u8) -> Result<f32, HalError>;

    /// Read the level of a digital status line.
    fn read_line(&mut self, line: DigitalLine) -> Result<LineLevel, HalError>;

    /// Read the one-wire ambient sensor.
    fn read_temperature_sensor(&mut self) -> Result<TemperatureReading, HalError>;

    /// Whether the one-wire bus shares pins with the serial transport. When
    /// true the sensor is only read while the transport is idle.
    fn shares_transport(&self) -> bool {
        false
    }
}

/// Actuator side of the node.
pub trait DriveOutputs: Send {
    /// Drive the remote-drive line.
    fn set_drive(&mut self, on: bool) -> Result<(), HalError>;

    /// Emit a high-then-low pulse on the remote-reset line.
    fn pulse_reset(&mut self) -> Result<(), HalError>;
}

/// Serial transmit path shared by the reporting cadence and the sensor side.
pub trait Transport: Send + Sync {
    fn status(&self) -> TransportStatus;

    #[inline]
    fn is_busy(&self) -> bool {
        self.status().contains(TransportStatus::TX_BUSY)
    }

    /// Queue `bytes` for transmission.
    ///
    /// # Errors
    /// `TransportBusy` while a line is going out, `TxOverrun` when `bytes`
    /// exceeds the transmit buffer (also latches `TX_OVERRUN`).
    fn transmit(&self, bytes: &[u8]) -> Result<(), HalError>;
}
