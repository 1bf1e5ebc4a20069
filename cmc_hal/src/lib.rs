//! # Compressor M&C HAL Library
//!
//! Driver side of the node: implementations of the collaborator traits
//! defined in `cmc_common::hal`, selected by name through a registry.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       cmc_hal                                │
//! │  ┌──────────────────┐        ┌────────────────────────────┐  │
//! │  │ DriverRegistry   │──────► │ DriverFactory(&NodeConfig) │  │
//! │  └──────────────────┘        └─────────────┬──────────────┘  │
//! │                                            ▼                 │
//! │                      DriverSet { acquisition, outputs,       │
//! │                                  transport }                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::{DriverFactory, DriverRegistry, DriverSet};
