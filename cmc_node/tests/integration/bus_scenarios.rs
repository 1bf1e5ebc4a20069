//! Request/response scenarios over the dispatcher.

use cmc_common::bus::{BusMessage, ControlPoint};
use cmc_common::consts::{AGE_SENTINEL_MINUTES, ELAPSED_NOT_APPLICABLE, MIN_OFF_DWELL_S_DEFAULT};
use cmc_common::hal::{DigitalLine, HalError, LineLevel};
use cmc_common::status::{StatusId, StatusValue};
use cmc_node::dispatch::{DispatchOutcome, IgnoreReason};
use cmc_node::guard::GuardDecision;

use super::{start_node, test_config};

#[test]
fn temp1_reads_converted_channel_8() {
    let mut config = test_config();
    config.simulation.channel_volts = vec![(8, 2.78)];
    let (mut node, _) = start_node(&config);
    node.acquire();

    let mut msg = BusMessage::query(0x00001);
    node.handle(&mut msg);
    assert_eq!(msg.len, 4);
    assert_eq!(msg.payload(), &(18.0f32 * 2.78 - 30.0).to_be_bytes());
}

#[test]
fn denied_turn_on_is_echoed_then_honored_after_dwell() {
    let (mut node, sim) = start_node(&test_config());

    let mut on = BusMessage::command(0x01001, &[0x01]);
    assert!(matches!(
        node.handle(&mut on),
        DispatchOutcome::Drive(GuardDecision::Denied { .. })
    ));

    let mut readback = BusMessage::query(0x01001);
    node.handle(&mut readback);
    assert_eq!(readback.payload(), &[0x01]);
    assert_eq!(node.read(StatusId::DriveState).0, StatusValue::Byte(0));
    assert!(!sim.plant.drive_output());

    node.advance_seconds(MIN_OFF_DWELL_S_DEFAULT + 1);
    let mut on = BusMessage::command(0x01001, &[0x01]);
    assert_eq!(
        node.handle(&mut on),
        DispatchOutcome::Drive(GuardDecision::Applied { on: true })
    );
    assert!(sim.plant.drive_output());
    assert_eq!(node.read(StatusId::DriveState), (StatusValue::Byte(1), 0));

    // Drive indication follows the output through the next sample.
    node.acquire();
    assert_eq!(node.read(StatusId::DriveIndication).0, StatusValue::Byte(1));
}

#[test]
fn elapsed_time_points_follow_the_guard() {
    let (mut node, _) = start_node(&test_config());
    let query = |node: &mut cmc_node::Node, rca| {
        let mut msg = BusMessage::query(rca);
        node.handle(&mut msg);
        u32::from_be_bytes([msg.data[0], msg.data[1], msg.data[2], msg.data[3]])
    };

    assert_eq!(query(&mut node, 0x0000F), ELAPSED_NOT_APPLICABLE);
    node.advance_seconds(400);
    assert_eq!(query(&mut node, 0x0000F), 400);
    assert_eq!(query(&mut node, 0x0000E), ELAPSED_NOT_APPLICABLE);

    node.handle(&mut BusMessage::command(0x01001, &[1]));
    node.advance_seconds(200);
    assert_eq!(query(&mut node, 0x0000E), 200);
    assert_eq!(query(&mut node, 0x0000F), ELAPSED_NOT_APPLICABLE);
}

#[test]
fn bypass_allows_rapid_cycling() {
    let (mut node, sim) = start_node(&test_config());
    node.handle(&mut BusMessage::command(0x02000, &[0x01]));

    for (i, byte) in [1u8, 0, 1, 0].into_iter().enumerate() {
        node.advance_seconds(1);
        let outcome = node.handle(&mut BusMessage::command(0x01001, &[byte]));
        assert!(
            matches!(outcome, DispatchOutcome::Drive(GuardDecision::Applied { .. })),
            "step {i}: {outcome:?}"
        );
        assert_eq!(sim.plant.drive_output(), byte != 0);
    }

    node.handle(&mut BusMessage::command(0x02000, &[0x00]));
    node.advance_seconds(1);
    let outcome = node.handle(&mut BusMessage::command(0x01001, &[1]));
    assert!(matches!(outcome, DispatchOutcome::Drive(GuardDecision::Denied { .. })));
}

#[test]
fn pushed_points_age_in_minutes() {
    let (mut node, _) = start_node(&test_config());
    node.advance_seconds(10);
    node.handle(&mut BusMessage::command(0x01005, &2.5e-6f32.to_be_bytes()));
    node.handle(&mut BusMessage::command(0x01007, &[1]));
    node.advance_seconds(125);

    let mut msg = BusMessage::query(0x00012);
    assert_eq!(
        node.handle(&mut msg),
        DispatchOutcome::Monitor {
            id: StatusId::CryostatPressure,
            value: StatusValue::Float(2.5e-6),
            age: 2,
        }
    );
    assert_eq!(node.read(StatusId::BackingPumpState), (StatusValue::Byte(1), 2));
    assert_eq!(node.read(StatusId::Cryo4kTemperature).1, AGE_SENTINEL_MINUTES);
}

#[test]
fn reset_command_pulses_the_line() {
    let (mut node, sim) = start_node(&test_config());
    assert_eq!(node.handle(&mut BusMessage::command(0x01002, &[1])), DispatchOutcome::Reset);
    assert_eq!(sim.plant.reset_pulses(), 1);
}

#[test]
fn protocol_noops_leave_message_untouched() {
    let (mut node, _) = start_node(&test_config());
    for mut msg in [
        BusMessage::command(0x00001, &[1, 2, 3, 4]),
        BusMessage::query(0x0100C),
        BusMessage::query(0x00015),
        BusMessage::query(0xFF_FFFF),
    ] {
        let before = msg;
        assert!(matches!(node.handle(&mut msg), DispatchOutcome::Ignored(_)));
        assert_eq!(msg, before);
    }

    let mut short = BusMessage::command(0x01004, &[0x41]);
    assert_eq!(
        node.handle(&mut short),
        DispatchOutcome::Ignored(IgnoreReason::ShortPayload { expected: 4, got: 1 })
    );
}

#[test]
fn failing_sensor_leaves_ambient_stale() {
    let (mut node, sim) = start_node(&test_config());
    node.acquire();
    assert_eq!(node.read(StatusId::AmbientTemperature), (StatusValue::Float(21.0), 0));

    sim.plant.set_sensor_fault(Some(HalError::SensorCrc));
    sim.plant.set_line(DigitalLine::TemperatureAlarm, LineLevel::Low);
    node.advance_seconds(180);
    node.acquire();

    assert_eq!(node.read(StatusId::AmbientTemperature), (StatusValue::Float(21.0), 3));
    assert_eq!(node.read(StatusId::TemperatureAlarm), (StatusValue::Byte(1), 0));
    assert_eq!(&node.facility_status()[..7], b"OWSCRCE");
}

#[test]
fn failed_drive_line_keeps_guard_and_state_off() {
    let (mut node, sim) = start_node(&test_config());
    node.advance_seconds(MIN_OFF_DWELL_S_DEFAULT + 1);
    sim.plant.set_output_fault(true);

    let mut on = BusMessage::command(0x01001, &[0x01]);
    assert_eq!(
        node.handle(&mut on),
        DispatchOutcome::OutputFault(ControlPoint::SetRemoteDrive)
    );
    assert!(!sim.plant.drive_output());
    assert!(!node.state().guard.is_on());
    assert_eq!(node.read(StatusId::DriveState).0, StatusValue::Byte(0));
    assert_eq!(
        node.state().guard.time_since_power_off(MIN_OFF_DWELL_S_DEFAULT + 1),
        MIN_OFF_DWELL_S_DEFAULT + 1
    );

    // Line repaired: the same request now switches without waiting a new dwell.
    sim.plant.set_output_fault(false);
    assert_eq!(
        node.handle(&mut on),
        DispatchOutcome::Drive(GuardDecision::Applied { on: true })
    );
    assert!(sim.plant.drive_output());
}
