//! Simulated compressor plant.
//!
//! The `SimulatedPlant` holds the electrical state seen by the node:
//! - Analog channel voltages
//! - Digital status line levels
//! - The one-wire ambient sensor scratchpad
//! - Remote drive and remote reset outputs
//!
//! The remote drive output is wired to the drive indication input, inverted:
//! switching the drive on pulls the indication line LOW.
//!
//! Handles are cheap clones sharing one state, so a test can keep a handle
//! while the node owns the trait objects. Line levels and outputs are atomics
//! apart from the sampled state, so switching an output never waits for a
//! conversion in progress.

use cmc_common::hal::{
    AcquisitionSource, AdcTiming, DIGITAL_LINE_COUNT, DigitalLine, DriveOutputs, HalError, LineLevel,
    MAX_ANALOG_CHANNEL, TemperatureReading, check_channel,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::{debug, trace};

const CHANNEL_COUNT: usize = MAX_ANALOG_CHANNEL as usize + 1;

#[derive(Debug)]
struct PlantState {
    volts: [f32; CHANNEL_COUNT],
    ambient: TemperatureReading,
    sensor_fault: Option<HalError>,
    shares_transport: bool,
    timing: Option<AdcTiming>,
    samples: u64,
}

/// Digital lines and output latches. `true` is a HIGH level.
#[derive(Debug)]
struct PlantLines {
    levels: [AtomicBool; DIGITAL_LINE_COUNT],
    drive_on: AtomicBool,
    reset_pulses: AtomicU32,
    output_fault: AtomicBool,
}

impl PlantLines {
    fn level(&self, line: DigitalLine) -> LineLevel {
        LineLevel::from_high(self.levels[line.index()].load(Ordering::Acquire))
    }

    fn set_level(&self, line: DigitalLine, level: LineLevel) {
        self.levels[line.index()].store(!level.is_low(), Ordering::Release);
    }
}

/// Shared handle on the simulated plant.
#[derive(Debug, Clone)]
pub struct SimulatedPlant {
    state: Arc<Mutex<PlantState>>,
    lines: Arc<PlantLines>,
}

impl SimulatedPlant {
    /// Plant at rest: all channels at 0 V, alarms inactive, drive off.
    pub fn new(ambient_celsius: f32, shares_transport: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlantState {
                volts: [0.0; CHANNEL_COUNT],
                ambient: TemperatureReading::from_celsius(ambient_celsius),
                sensor_fault: None,
                shares_transport,
                timing: None,
                samples: 0,
            })),
            lines: Arc::new(PlantLines {
                levels: std::array::from_fn(|_| AtomicBool::new(true)),
                drive_on: AtomicBool::new(false),
                reset_pulses: AtomicU32::new(0),
                output_fault: AtomicBool::new(false),
            }),
        }
    }

    /// Set the voltage seen on an analog channel.
    ///
    /// # Errors
    /// `ChannelOutOfRange` above the converter's last channel.
    pub fn set_channel_volts(&self, channel: u8, volts: f32) -> Result<(), HalError> {
        check_channel(channel)?;
        self.state.lock().volts[channel as usize] = volts;
        Ok(())
    }

    /// Force a digital line level.
    pub fn set_line(&self, line: DigitalLine, level: LineLevel) {
        self.lines.set_level(line, level);
    }

    /// Current level of a digital line.
    pub fn line(&self, line: DigitalLine) -> LineLevel {
        self.lines.level(line)
    }

    /// Set the ambient temperature reported by the one-wire sensor.
    pub fn set_ambient_celsius(&self, celsius: f32) {
        self.state.lock().ambient = TemperatureReading::from_celsius(celsius);
    }

    /// Make every sensor read fail with `fault` until cleared with `None`.
    pub fn set_sensor_fault(&self, fault: Option<HalError>) {
        self.state.lock().sensor_fault = fault;
    }

    /// Make every output switch fail until cleared.
    pub fn set_output_fault(&self, fault: bool) {
        self.lines.output_fault.store(fault, Ordering::Release);
    }

    /// Remote drive output level.
    pub fn drive_output(&self) -> bool {
        self.lines.drive_on.load(Ordering::Acquire)
    }

    /// Number of reset pulses emitted so far.
    pub fn reset_pulses(&self) -> u32 {
        self.lines.reset_pulses.load(Ordering::Acquire)
    }

    /// Timing applied by the last `configure` call.
    pub fn timing(&self) -> Option<AdcTiming> {
        self.state.lock().timing
    }

    /// Number of analog conversions performed.
    pub fn samples(&self) -> u64 {
        self.state.lock().samples
    }
}

impl AcquisitionSource for SimulatedPlant {
    fn name(&self) -> &'static str {
        super::DRIVER_NAME
    }

    fn configure(&mut self, timing: &AdcTiming) -> Result<(), HalError> {
        debug!(
            mode = timing.mode,
            sample_control = timing.sample_control,
            conversion_control = timing.conversion_control,
            "Simulated converter configured"
        );
        self.state.lock().timing = Some(*timing);
        Ok(())
    }

    fn sample(&mut self, channel: u8) -> Result<f32, HalError> {
        check_channel(channel)?;
        let mut state = self.state.lock();
        state.samples += 1;
        let volts = state.volts[channel as usize];
        trace!(channel, volts, "sample");
        Ok(volts)
    }

    fn read_line(&mut self, line: DigitalLine) -> Result<LineLevel, HalError> {
        Ok(self.lines.level(line))
    }

    fn read_temperature_sensor(&mut self) -> Result<TemperatureReading, HalError> {
        let state = self.state.lock();
        match &state.sensor_fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(state.ambient),
        }
    }

    fn shares_transport(&self) -> bool {
        self.state.lock().shares_transport
    }
}

impl DriveOutputs for SimulatedPlant {
    fn set_drive(&mut self, on: bool) -> Result<(), HalError> {
        if self.lines.output_fault.load(Ordering::Acquire) {
            return Err(HalError::OutputFailed("remote drive"));
        }
        self.lines.drive_on.store(on, Ordering::Release);
        self.lines.set_level(DigitalLine::DriveIndication, LineLevel::from_high(!on));
        debug!(on, "Remote drive line");
        Ok(())
    }

    fn pulse_reset(&mut self) -> Result<(), HalError> {
        if self.lines.output_fault.load(Ordering::Acquire) {
            return Err(HalError::OutputFailed("remote reset"));
        }
        self.lines.reset_pulses.fetch_add(1, Ordering::AcqRel);
        debug!("Remote reset pulse");
        Ok(())
    }
}
