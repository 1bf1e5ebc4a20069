//! # Compressor Monitor & Control Node Library
//!
//! Firmware core of a refrigeration compressor node on a shared
//! request/response bus. Keeps a typed status store refreshed from the
//! compressor's analog channels, status lines and ambient sensor, answers
//! monitor and control requests, and protects the compressor from short
//! cycling with a dwell-time actuation guard.
//!
//! ## Components
//!
//! 1. **StatusStore** (`store`): one atomic cell per status point plus its
//!    last-update second
//! 2. **ActuationGuard** (`guard`): minimum on/off dwell state machine with
//!    a diagnostic bypass
//! 3. **Dispatcher** (`dispatch`): monitor reads, control commands and
//!    control read-back
//! 4. **Acquisition** (`acquisition`): periodic sampling into the store
//! 5. **ReportingCadence** (`cadence`): paced text lines over the transport
//!
//! `runtime` wires these onto threads; `peer` is the console front end.
//!
//! ## Lock-free hot path
//!
//! The dispatcher touches the shared atomics, its own read-back table and
//! the drive outputs. The simulation driver keeps its outputs in atomics
//! apart from the sampled state, so a bus request never waits on a
//! sampling tick in progress.

pub mod acquisition;
pub mod cadence;
pub mod clock;
pub mod dispatch;
pub mod error;
pub mod guard;
pub mod peer;
pub mod runtime;
pub mod scheduler;
pub mod state;
pub mod store;

pub use error::NodeError;
pub use runtime::{BusClient, Node, RunningNode};
