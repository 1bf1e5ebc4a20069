//! Acquisition tick: refreshes the sensor points of the status store.
//!
//! Each tick samples the analog channels, reads the three digital status
//! lines and, when the transport allows it, the one-wire ambient sensor.
//! Faults are reported to the facility registry and the affected point is
//! left alone so its age keeps growing.

use cmc_common::facility::{FacilityId, FacilityRegistry};
use cmc_common::hal::{
    ADC_CODES, ADC_FACILITY, AUX_CHANNELS, AcquisitionSource, AdcFault, AdcSetup, DigitalLine,
    HalError, PRESSURE_CHANNEL, SENSOR_CODES, SENSOR_FACILITY, TEMP_CHANNELS, Transport,
};
use cmc_common::status::{StatusId, StatusValue};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::error::NodeError;
use crate::state::NodeState;

/// One-wire sensor fault codes, as registered under [`SENSOR_FACILITY`].
const SENSOR_NO_DEVICE: u8 = 1;
const SENSOR_CRC: u8 = 2;

// ─── Conversions ────────────────────────────────────────────────────

/// Compressor temperature sensor: 18 °C/V with −30 °C offset.
#[inline]
pub fn temperature_from_volts(volts: f32) -> f32 {
    18.0 * volts - 30.0
}

/// Auxiliary inputs are reported in volts.
#[inline]
pub fn aux_from_volts(volts: f32) -> f32 {
    volts
}

/// Return pressure transducer: 1 MPa/V with 1 V offset.
#[inline]
pub fn pressure_from_volts(volts: f32) -> f32 {
    volts - 1.0
}

/// Analog channel, target point and engineering conversion.
const ANALOG_POINTS: [(u8, StatusId, fn(f32) -> f32); 7] = [
    (TEMP_CHANNELS[0], StatusId::Temp1, temperature_from_volts),
    (TEMP_CHANNELS[1], StatusId::Temp2, temperature_from_volts),
    (TEMP_CHANNELS[2], StatusId::Temp3, temperature_from_volts),
    (TEMP_CHANNELS[3], StatusId::Temp4, temperature_from_volts),
    (AUX_CHANNELS[0], StatusId::Aux1, aux_from_volts),
    (AUX_CHANNELS[1], StatusId::Aux2, aux_from_volts),
    (PRESSURE_CHANNEL, StatusId::Pressure, pressure_from_volts),
];

/// Digital line and the flag point it feeds.
const LINE_POINTS: [(DigitalLine, StatusId); 3] = [
    (DigitalLine::PressureAlarm, StatusId::PressureAlarm),
    (DigitalLine::TemperatureAlarm, StatusId::TemperatureAlarm),
    (DigitalLine::DriveIndication, StatusId::DriveIndication),
];

// ─── Tick ───────────────────────────────────────────────────────────

/// Outcome of the one-wire sensor step of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorStep {
    /// Ambient temperature written.
    Read(f32),
    /// Transport busy and the sensor shares its line; retried next tick.
    Deferred,
    /// Read failed and was reported.
    Failed,
}

/// Summary of one acquisition tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Points written.
    pub updated: u8,
    /// Faults reported.
    pub faults: u8,
    pub sensor: SensorStep,
}

/// Periodic sampler owned by the timer thread.
pub struct Acquisition {
    source: Box<dyn AcquisitionSource>,
    transport: Arc<dyn Transport>,
    state: Arc<NodeState>,
    registry: Arc<Mutex<FacilityRegistry>>,
    adc: FacilityId,
    sensor: FacilityId,
}

impl Acquisition {
    /// Register the converter and sensor facilities, validate the converter
    /// setup and configure the source.
    ///
    /// # Errors
    /// `NodeError::Adc` for an out-of-range mode or conversion time; the
    /// fault is latched in the registry first. Registry and source errors
    /// propagate unchanged.
    pub fn start(
        mut source: Box<dyn AcquisitionSource>,
        transport: Arc<dyn Transport>,
        state: Arc<NodeState>,
        registry: Arc<Mutex<FacilityRegistry>>,
        setup: &AdcSetup,
    ) -> Result<Self, NodeError> {
        let (adc, sensor, timing) = {
            let mut reg = registry.lock();
            let adc = reg.register(ADC_FACILITY, ADC_CODES)?;
            let sensor = reg.register(SENSOR_FACILITY, SENSOR_CODES)?;
            let timing = match setup.validate() {
                Ok(timing) => timing,
                Err(fault) => {
                    reg.report(adc, fault.code());
                    return Err(NodeError::Adc(fault));
                }
            };
            (adc, sensor, timing)
        };

        source.configure(&timing)?;
        info!(
            source = source.name(),
            mode = timing.mode,
            conversion_time = setup.conversion_time,
            "Acquisition configured"
        );

        Ok(Self {
            source,
            transport,
            state,
            registry,
            adc,
            sensor,
        })
    }

    /// Sample every source once and refresh the store.
    pub fn tick(&mut self) -> TickReport {
        let now = self.state.now();
        let mut report = TickReport {
            updated: 0,
            faults: 0,
            sensor: SensorStep::Deferred,
        };

        for &(channel, id, convert) in ANALOG_POINTS.iter() {
            match self.source.sample(channel) {
                Ok(volts) => {
                    self.state.store.update(id, StatusValue::Float(convert(volts)), now);
                    report.updated += 1;
                }
                Err(e) => {
                    self.analog_fault(channel, &e);
                    report.faults += 1;
                }
            }
        }

        for (line, id) in LINE_POINTS {
            match self.source.read_line(line) {
                Ok(level) => {
                    self.state.store.update(id, StatusValue::Byte(level.is_low() as u8), now);
                    report.updated += 1;
                }
                Err(e) => {
                    warn!(?line, "Digital line read failed: {e}");
                    report.faults += 1;
                }
            }
        }

        report.sensor = self.read_sensor(now);
        match report.sensor {
            SensorStep::Read(_) => report.updated += 1,
            SensorStep::Failed => report.faults += 1,
            SensorStep::Deferred => {}
        }

        trace!(t = now, updated = report.updated, faults = report.faults, "acquisition tick");
        report
    }

    fn analog_fault(&self, channel: u8, error: &HalError) {
        warn!(channel, "Analog sample failed: {error}");
        if let HalError::ChannelOutOfRange(_) = error {
            self.registry
                .lock()
                .report(self.adc, AdcFault::ChannelOutOfRange.code());
        }
    }

    fn read_sensor(&mut self, now: u32) -> SensorStep {
        if self.source.shares_transport() && self.transport.is_busy() {
            debug!("Ambient sensor read deferred, transport busy");
            return SensorStep::Deferred;
        }

        let code = match self.source.read_temperature_sensor() {
            Ok(reading) => match reading.celsius() {
                Some(celsius) => {
                    self.state
                        .store
                        .update(StatusId::AmbientTemperature, StatusValue::Float(celsius), now);
                    return SensorStep::Read(celsius);
                }
                None => SENSOR_CRC,
            },
            Err(HalError::SensorAbsent) => SENSOR_NO_DEVICE,
            Err(e) => {
                warn!("Ambient sensor read failed: {e}");
                SENSOR_CRC
            }
        };
        self.registry.lock().report(self.sensor, code);
        SensorStep::Failed
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
