//! Prelude module for common re-exports.
//!
//! ```rust
//! use cmc_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, NodeConfig, SharedConfig};

// ─── Status points ──────────────────────────────────────────────────
pub use crate::status::{Revision, StatusId, StatusValue, ValueKind, STATUS_POINT_COUNT};

// ─── Bus ────────────────────────────────────────────────────────────
pub use crate::bus::{AddressClass, BusMessage, ControlPoint, Direction, classify};

// ─── Collaborators ──────────────────────────────────────────────────
pub use crate::facility::{FacilityError, FacilityId, FacilityRegistry};
pub use crate::hal::{
    AcquisitionSource, DigitalLine, DriveOutputs, HalError, LineLevel, TemperatureReading,
    Transport, TransportStatus,
};
