//! Simulation driver module.
//!
//! Software stand-in for the compressor, the converter, the one-wire sensor
//! and the serial transmitter, for development and testing without the
//! node hardware.

mod plant;
mod transport;

pub use plant::SimulatedPlant;
pub use transport::SimulatedTransport;

use crate::driver_registry::DriverSet;
use cmc_common::config::{NodeConfig, SimulationConfig};
use cmc_common::hal::HalError;
use std::sync::Arc;
use tracing::info;

/// Registry name of the simulation driver.
pub const DRIVER_NAME: &str = "simulation";

/// Test-side handles on a simulated driver set.
#[derive(Debug, Clone)]
pub struct SimulationHandles {
    /// Plant shared with the acquisition and output trait objects.
    pub plant: SimulatedPlant,
    /// Transmitter shared with the node.
    pub transport: Arc<SimulatedTransport>,
}

/// Build a driver set and keep handles on its simulated state.
///
/// # Errors
/// `ChannelOutOfRange` if `channel_volts` names a channel above the
/// converter's last channel.
pub fn build(config: &SimulationConfig) -> Result<(DriverSet, SimulationHandles), HalError> {
    let plant = SimulatedPlant::new(config.ambient_celsius, config.sensor_shares_transport);
    for &(channel, volts) in &config.channel_volts {
        plant.set_channel_volts(channel, volts)?;
    }
    let transport = Arc::new(SimulatedTransport::new(config.transmit_baud, config.echo));

    info!(
        channels = config.channel_volts.len(),
        baud = config.transmit_baud,
        "Simulation driver ready"
    );

    let set = DriverSet {
        acquisition: Box::new(plant.clone()),
        outputs: Box::new(plant.clone()),
        transport: transport.clone(),
    };
    Ok((set, SimulationHandles { plant, transport }))
}

/// Factory registered under [`DRIVER_NAME`].
pub fn create_driver(config: &NodeConfig) -> Result<DriverSet, HalError> {
    build(&config.simulation).map(|(set, _)| set)
}
