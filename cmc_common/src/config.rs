//! Configuration loading traits and node configuration types.
//!
//! Every binary in the workspace reads a single TOML file through the
//! blanket [`ConfigLoader`] trait. Only `[shared]` is mandatory; every other
//! section falls back to the defaults in [`crate::consts`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use cmc_common::config::{ConfigLoader, ConfigError, NodeConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = NodeConfig::load(Path::new("node.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::consts::{
    ACQUISITION_PERIOD_MS_DEFAULT, MAX_DWELL_S, MIN_OFF_DWELL_S_DEFAULT, MIN_ON_DWELL_S_DEFAULT,
    REPORT_SPACING_MS_DEFAULT, SECOND_TICK_MS_DEFAULT, SER_BAUD_DEFAULT,
};
use crate::hal::AdcSetup;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Logging verbosity, lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Fields common to every application in the workspace.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "compressor-node-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Node instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load a deserializable type from a TOML file.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if the file is unreadable or the TOML is invalid
///
/// Semantic validation is left to the loaded type.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from an in-memory TOML document.
    fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Node configuration ─────────────────────────────────────────────

/// Dwell times enforced by the actuation guard, fixed at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Minimum run time before the drive may be switched off [s].
    pub min_on_dwell_s: u32,
    /// Minimum rest time before the drive may be switched on [s].
    pub min_off_dwell_s: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            min_on_dwell_s: MIN_ON_DWELL_S_DEFAULT,
            min_off_dwell_s: MIN_OFF_DWELL_S_DEFAULT,
        }
    }
}

/// Periods of the scheduler tasks and the reporting cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub second_tick_ms: u64,
    pub acquisition_period_ms: u64,
    pub report_spacing_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            second_tick_ms: SECOND_TICK_MS_DEFAULT,
            acquisition_period_ms: ACQUISITION_PERIOD_MS_DEFAULT,
            report_spacing_ms: REPORT_SPACING_MS_DEFAULT,
        }
    }
}

/// Which driver backs the collaborator traits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub name: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: "simulation".to_string(),
        }
    }
}

/// Initial state of the simulated plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// `(channel, volts)` pairs applied at start. Unlisted channels read 0 V.
    pub channel_volts: Vec<(u8, f32)>,
    /// Serial rate used to model transmission time. Zero means transmissions
    /// stay busy until completed by hand.
    pub transmit_baud: u32,
    /// Ambient temperature reported by the simulated one-wire sensor [°C].
    pub ambient_celsius: f32,
    /// The one-wire bus shares pins with the serial transmitter.
    pub sensor_shares_transport: bool,
    /// Echo transmitted report lines to stdout.
    pub echo: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            channel_volts: Vec::new(),
            transmit_baud: SER_BAUD_DEFAULT,
            ambient_celsius: 21.0,
            sensor_shares_transport: true,
            echo: false,
        }
    }
}

/// Complete node configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub adc: AdcSetup,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl NodeConfig {
    /// Defaults for every section, with the given service name.
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::default(),
                service_name: service_name.into(),
            },
            guard: GuardConfig::default(),
            timing: TimingConfig::default(),
            adc: AdcSetup::default(),
            driver: DriverConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }

    /// Validate the configuration.
    ///
    /// ADC mode and conversion time are range-checked later, when the
    /// acquisition facility starts, so the fault reaches the registry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `shared.service_name` is empty
    /// - a dwell time is zero or not below 2³¹ s (wrapping comparisons
    ///   need the interval to fit in half the counter range)
    /// - a timing period is zero
    /// - the acquisition period is not shorter than the second tick
    /// - `driver.name` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.guard.min_on_dwell_s == 0 || self.guard.min_off_dwell_s == 0 {
            return Err(ConfigError::ValidationError(
                "dwell times must be greater than zero".to_string(),
            ));
        }
        if self.guard.min_on_dwell_s >= MAX_DWELL_S || self.guard.min_off_dwell_s >= MAX_DWELL_S {
            return Err(ConfigError::ValidationError(format!(
                "dwell times must be below {MAX_DWELL_S} s"
            )));
        }

        let t = &self.timing;
        if t.second_tick_ms == 0 || t.acquisition_period_ms == 0 || t.report_spacing_ms == 0 {
            return Err(ConfigError::ValidationError(
                "timing periods must be greater than zero".to_string(),
            ));
        }
        if t.acquisition_period_ms >= t.second_tick_ms {
            return Err(ConfigError::ValidationError(format!(
                "acquisition_period_ms ({}) must be shorter than second_tick_ms ({})",
                t.acquisition_period_ms, t.second_tick_ms
            )));
        }

        if self.driver.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "driver name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
