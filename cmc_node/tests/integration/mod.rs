//! Shared fixtures for the integration scenarios.

mod bus_scenarios;
mod reporting;
mod startup;

use cmc_common::config::NodeConfig;
use cmc_hal::drivers::simulation::{self, SimulationHandles};
use cmc_node::Node;

/// Default node configuration with a hand-stepped transport.
pub fn test_config() -> NodeConfig {
    let mut config = NodeConfig::with_service_name("integration-node");
    config.simulation.transmit_baud = 0;
    config
}

/// Node on the simulation driver plus handles on the simulated plant.
pub fn start_node(config: &NodeConfig) -> (Node, SimulationHandles) {
    let (drivers, handles) = simulation::build(&config.simulation).expect("simulation driver");
    let node = Node::start(config, drivers).expect("node start");
    (node, handles)
}
