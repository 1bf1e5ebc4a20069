//! Node start: configuration, driver selection and converter setup.

use cmc_common::bus::BusMessage;
use cmc_common::config::{ConfigLoader, NodeConfig};
use cmc_common::hal::{AdcFault, HalError};
use cmc_common::status::{StatusId, StatusValue};
use cmc_hal::DriverRegistry;
use cmc_hal::drivers::simulation;
use cmc_node::dispatch::DispatchOutcome;
use cmc_node::guard::GuardDecision;
use cmc_node::{Node, NodeError};
use std::fs;
use tempfile::TempDir;

use super::{start_node, test_config};

#[test]
fn adc_misconfiguration_aborts_start() {
    let mut config = test_config();
    config.adc.mode = 4;
    let (drivers, sim) = simulation::build(&config.simulation).unwrap();

    let result = Node::start(&config, drivers);
    assert!(matches!(result, Err(NodeError::Adc(AdcFault::ModeOutOfRange))));
    assert_eq!(sim.plant.timing(), None);
}

#[test]
fn valid_adc_setup_configures_the_source() {
    let mut config = test_config();
    config.adc.mode = 2;
    config.adc.conversion_time = 0x3;
    let (_node, sim) = start_node(&config);

    let timing = sim.plant.timing().unwrap();
    assert_eq!(timing.mode, 2);
    assert_eq!((timing.sample_control, timing.conversion_control), (0, 0));
}

#[test]
fn toml_file_drives_the_node() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("node.toml");
    fs::write(
        &path,
        r#"
[shared]
service_name = "bench-node"

[guard]
min_on_dwell_s = 5
min_off_dwell_s = 7

[simulation]
channel_volts = [[14, 2.5]]
transmit_baud = 0
"#,
    )
    .unwrap();

    let config = NodeConfig::load(&path).unwrap();
    let registry = DriverRegistry::with_builtin();
    let drivers = registry.create(&config.driver.name, &config).unwrap();
    let mut node = Node::start(&config, drivers).unwrap();

    node.acquire();
    assert_eq!(node.read(StatusId::Pressure).0, StatusValue::Float(1.5));

    node.advance_seconds(8);
    assert_eq!(
        node.handle(&mut BusMessage::command(0x01001, &[1])),
        DispatchOutcome::Drive(GuardDecision::Applied { on: true })
    );
}

#[test]
fn unknown_driver_is_rejected() {
    let config = test_config();
    let registry = DriverRegistry::with_builtin();
    assert!(matches!(
        registry.create("ni-daq", &config),
        Err(HalError::DriverNotFound(name)) if name == "ni-daq"
    ));
}

#[test]
fn revision_is_available_immediately() {
    let (mut node, _) = start_node(&test_config());
    let mut msg = BusMessage::query(0x0000B);
    node.handle(&mut msg);
    assert_eq!(msg.len, 3);
    assert_eq!(msg.payload(), &[1, 2, 0]);
}
