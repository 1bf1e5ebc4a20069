//! Reporting cadence over the simulated transmitter.

use cmc_common::status::StatusId;
use cmc_node::cadence::CadenceStep;

use super::{start_node, test_config};

#[test]
fn first_line_reports_acquired_temperature() {
    let mut config = test_config();
    config.simulation.channel_volts = vec![(8, 2.78)];
    let (mut node, sim) = start_node(&config);
    node.acquire();

    assert_eq!(node.poll_report(0), CadenceStep::Emitted(StatusId::Temp1));
    assert_eq!(sim.transport.sent_lines(), vec!["TEMP_1 20.04 C age=0\r\n".to_string()]);
}

#[test]
fn busy_transport_never_drops_or_batches() {
    let (mut node, sim) = start_node(&test_config());
    let mut now = 0;
    let mut emitted = Vec::new();

    // Two full cycles with the transmitter completing only every third poll.
    for poll in 0.. {
        if poll % 3 == 0 {
            sim.transport.complete();
        }
        if let CadenceStep::Emitted(id) = node.poll_report(now) {
            emitted.push(id);
        }
        now += 700;
        if emitted.len() == 2 * StatusId::ALL.len() {
            break;
        }
    }

    let expected: Vec<_> = StatusId::ALL.iter().chain(StatusId::ALL.iter()).copied().collect();
    assert_eq!(emitted, expected);

    let lines = sim.transport.sent_lines();
    assert_eq!(lines.len(), emitted.len());
    for (line, id) in lines.iter().zip(&emitted) {
        assert!(line.starts_with(id.label()), "{line:?}");
        assert_eq!(line.matches("\r\n").count(), 1);
    }
}

#[test]
fn spacing_is_respected_when_transport_is_idle() {
    let mut config = test_config();
    config.timing.report_spacing_ms = 500;
    let (mut node, sim) = start_node(&config);

    assert!(matches!(node.poll_report(1_000), CadenceStep::Emitted(_)));
    sim.transport.complete();
    assert_eq!(node.poll_report(1_200), CadenceStep::Idle);
    assert_eq!(node.poll_report(1_499), CadenceStep::Idle);
    assert_eq!(node.poll_report(1_500), CadenceStep::Emitted(StatusId::Temp2));
}
