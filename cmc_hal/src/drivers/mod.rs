//! Driver implementations.
//!
//! - [`simulation`] - Software plant for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the collaborator traits from `cmc_common::hal`
//! 3. Provide a `create_driver` factory and register it below

pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register all built-in drivers.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register(simulation::DRIVER_NAME, simulation::create_driver);
}
