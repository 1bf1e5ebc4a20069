//! Driver registry.
//!
//! Maps driver names to factories producing a complete [`DriverSet`]. Built
//! at startup and passed by value; no global state.

use cmc_common::config::NodeConfig;
use cmc_common::hal::{AcquisitionSource, DriveOutputs, HalError, Transport};
use std::collections::HashMap;
use std::sync::Arc;

/// Collaborators produced by one driver.
pub struct DriverSet {
    /// Sensor side, owned by the acquisition tick.
    pub acquisition: Box<dyn AcquisitionSource>,
    /// Actuator side, owned by the bus dispatcher.
    pub outputs: Box<dyn DriveOutputs>,
    /// Serial transmit path, shared by the cadence and the acquisition tick.
    pub transport: Arc<dyn Transport>,
}

/// Factory function type for creating a driver set.
pub type DriverFactory = fn(&NodeConfig) -> Result<DriverSet, HalError>;

/// Registry of available drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every built-in driver.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Build the driver set registered under `name`.
    ///
    /// # Errors
    /// `HalError::DriverNotFound` for an unknown name, or whatever the
    /// factory reports.
    pub fn create(&self, name: &str, config: &NodeConfig) -> Result<DriverSet, HalError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        factory(config)
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
