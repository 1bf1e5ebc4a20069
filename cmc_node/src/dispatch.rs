//! Protocol dispatcher.
//!
//! Every inbound bus message is handled synchronously by exactly one of:
//!
//! - **Monitor read**: query on a monitor address, answered with the point
//!   serialized big-endian at its wire width
//! - **Control command**: command on an assigned control address, decoded
//!   at the target's wire width and applied to the guard, a pushed point,
//!   the bypass flag or the reset line
//! - **Control read-back**: query on an assigned control address, answered
//!   with the last accepted raw payload (zeros before any command)
//! - **No-op**: anything else; the message is left untouched
//!
//! The dispatcher never waits on sampling: it touches the shared atomics,
//! its own read-back table and the drive outputs. A drive transition is
//! committed to the guard only once the output line has switched.

use cmc_common::bus::{AddressClass, BusMessage, CONTROL_POINT_COUNT, ControlPoint, Direction, classify};
use cmc_common::hal::DriveOutputs;
use cmc_common::status::{StatusId, StatusValue};
use std::sync::Arc;
use tracing::{debug, error, info, trace};

use crate::guard::GuardDecision;
use crate::state::NodeState;

/// Widest control payload.
const READBACK_LEN: usize = 4;

/// Why a message was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Outside every address range.
    UnknownAddress,
    /// Unassigned address inside the control block.
    ReservedAddress,
    /// Command sent to a monitor address.
    CommandOnMonitor,
    /// Payload shorter than the target's wire width.
    ShortPayload { expected: u8, got: u8 },
}

/// What the dispatcher did with a message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchOutcome {
    /// Monitor read answered.
    Monitor { id: StatusId, value: StatusValue, age: u8 },
    /// Control read-back answered.
    ReadBack(ControlPoint),
    /// Drive request evaluated by the guard.
    Drive(GuardDecision),
    /// Reset line pulsed.
    Reset,
    /// Pushed point written.
    Pushed { id: StatusId, value: StatusValue },
    /// Guard bypass set.
    Bypass(bool),
    /// Output line failed; guard and store left unchanged.
    OutputFault(ControlPoint),
    /// Message left untouched.
    Ignored(IgnoreReason),
}

/// Bus request handler. Owned by the bus thread.
pub struct Dispatcher {
    state: Arc<NodeState>,
    outputs: Box<dyn DriveOutputs>,
    readback: [[u8; READBACK_LEN]; CONTROL_POINT_COUNT],
}

impl Dispatcher {
    pub fn new(state: Arc<NodeState>, outputs: Box<dyn DriveOutputs>) -> Self {
        Self {
            state,
            outputs,
            readback: [[0; READBACK_LEN]; CONTROL_POINT_COUNT],
        }
    }

    /// Handle one message, writing any response into it.
    pub fn handle(&mut self, msg: &mut BusMessage) -> DispatchOutcome {
        let now = self.state.now();
        let outcome = match (classify(msg.relative_address), msg.direction) {
            (AddressClass::Monitor(id), Direction::Query) => self.monitor(id, msg, now),
            (AddressClass::Monitor(_), Direction::Command) => {
                DispatchOutcome::Ignored(IgnoreReason::CommandOnMonitor)
            }
            (AddressClass::Control(point), Direction::Query) => self.read_back(point, msg),
            (AddressClass::Control(point), Direction::Command) => self.command(point, msg, now),
            (AddressClass::ReservedControl, _) => {
                DispatchOutcome::Ignored(IgnoreReason::ReservedAddress)
            }
            (AddressClass::Inert, _) => DispatchOutcome::Ignored(IgnoreReason::UnknownAddress),
        };

        match outcome {
            DispatchOutcome::Ignored(reason) => {
                trace!(address = msg.relative_address, ?reason, "bus message ignored");
            }
            _ => trace!(%msg, ?outcome, "bus message handled"),
        }
        outcome
    }

    /// Last accepted payload of a control point, at its wire width.
    pub fn readback(&self, point: ControlPoint) -> &[u8] {
        let len = point.kind().wire_len() as usize;
        &self.readback[point.index()][..len]
    }

    fn monitor(&self, id: StatusId, msg: &mut BusMessage, now: u32) -> DispatchOutcome {
        let (value, age) = self.state.read_point(id, now);
        msg.len = value.encode(&mut msg.data);
        DispatchOutcome::Monitor { id, value, age }
    }

    fn read_back(&self, point: ControlPoint, msg: &mut BusMessage) -> DispatchOutcome {
        let bytes = self.readback(point);
        msg.data[..bytes.len()].copy_from_slice(bytes);
        msg.len = bytes.len() as u8;
        DispatchOutcome::ReadBack(point)
    }

    fn command(&mut self, point: ControlPoint, msg: &BusMessage, now: u32) -> DispatchOutcome {
        let kind = point.kind();
        let width = kind.wire_len();
        let payload = msg.payload();
        let Some(value) = StatusValue::decode(kind, payload) else {
            return DispatchOutcome::Ignored(IgnoreReason::ShortPayload {
                expected: width,
                got: payload.len() as u8,
            });
        };

        let width = width as usize;
        self.readback[point.index()][..width].copy_from_slice(&payload[..width]);

        match point {
            ControlPoint::SetRemoteDrive => self.drive(payload[0] != 0, now),
            ControlPoint::SetRemoteReset => {
                if let Err(e) = self.outputs.pulse_reset() {
                    error!("Remote reset pulse failed: {e}");
                    return DispatchOutcome::OutputFault(point);
                }
                DispatchOutcome::Reset
            }
            ControlPoint::SetGuardBypass => {
                let bypass = payload[0] != 0;
                self.state.guard.set_bypass(bypass);
                info!(bypass, "Actuation guard bypass changed");
                DispatchOutcome::Bypass(bypass)
            }
            pushed => match pushed.pushed_point() {
                Some(id) => {
                    self.state.store.update(id, value, now);
                    DispatchOutcome::Pushed { id, value }
                }
                None => DispatchOutcome::Ignored(IgnoreReason::UnknownAddress),
            },
        }
    }

    fn drive(&mut self, on: bool, now: u32) -> DispatchOutcome {
        let decision = self.state.guard.check(on, now);
        match decision {
            GuardDecision::Applied { on } => {
                if let Err(e) = self.outputs.set_drive(on) {
                    error!(on, "Remote drive output failed: {e}");
                    return DispatchOutcome::OutputFault(ControlPoint::SetRemoteDrive);
                }
                self.state.guard.commit(decision, now);
                self.state
                    .store
                    .update(StatusId::DriveState, StatusValue::Byte(on as u8), now);
                info!(on, t = now, "Compressor drive switched");
            }
            GuardDecision::Unchanged => debug!(on, "Drive request matches current state"),
            GuardDecision::Denied { remaining_s } => {
                debug!(on, remaining_s, t = now, "Drive request denied by dwell guard");
            }
        }
        DispatchOutcome::Drive(decision)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::DwellConfig;
    use cmc_common::hal::HalError;
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct Lines {
        drive: bool,
        resets: u32,
    }

    #[derive(Clone, Default)]
    struct RecordingOutputs(Arc<Mutex<Lines>>);

    impl DriveOutputs for RecordingOutputs {
        fn set_drive(&mut self, on: bool) -> Result<(), HalError> {
            self.0.lock().drive = on;
            Ok(())
        }

        fn pulse_reset(&mut self) -> Result<(), HalError> {
            self.0.lock().resets += 1;
            Ok(())
        }
    }

    struct FailingOutputs;

    impl DriveOutputs for FailingOutputs {
        fn set_drive(&mut self, _on: bool) -> Result<(), HalError> {
            Err(HalError::OutputFailed("remote drive"))
        }

        fn pulse_reset(&mut self) -> Result<(), HalError> {
            Err(HalError::OutputFailed("remote reset"))
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<NodeState>, RecordingOutputs) {
        let state = Arc::new(NodeState::new(DwellConfig { min_on_s: 180, min_off_s: 300 }));
        let outputs = RecordingOutputs::default();
        (Dispatcher::new(state.clone(), Box::new(outputs.clone())), state, outputs)
    }

    #[test]
    fn monitor_read_serializes_big_endian() {
        let (mut d, state, _) = dispatcher();
        state.store.update(StatusId::Temp1, StatusValue::Float(1.0), 0);
        let mut msg = BusMessage::query(0x00001);
        let outcome = d.handle(&mut msg);
        assert_eq!(msg.len, 4);
        assert_eq!(&msg.data[..4], &[0x3F, 0x80, 0x00, 0x00]);
        assert!(matches!(outcome, DispatchOutcome::Monitor { id: StatusId::Temp1, age: 0, .. }));
    }

    #[test]
    fn revision_read_is_three_bytes() {
        let (mut d, _, _) = dispatcher();
        let mut msg = BusMessage::query(0x0000B);
        d.handle(&mut msg);
        assert_eq!(msg.len, 3);
    }

    #[test]
    fn command_on_monitor_address_is_noop() {
        let (mut d, state, _) = dispatcher();
        let mut msg = BusMessage::command(0x00001, &[1, 2, 3, 4]);
        let before = msg;
        assert_eq!(
            d.handle(&mut msg),
            DispatchOutcome::Ignored(IgnoreReason::CommandOnMonitor)
        );
        assert_eq!(msg, before);
        assert_eq!(state.store.last_update(StatusId::Temp1), None);
    }

    #[test]
    fn unknown_and_reserved_addresses_are_inert() {
        let (mut d, _, _) = dispatcher();
        for (rca, reason) in [
            (0x00000, IgnoreReason::UnknownAddress),
            (0x00015, IgnoreReason::UnknownAddress),
            (0x30003, IgnoreReason::UnknownAddress),
            (0x0100A, IgnoreReason::ReservedAddress),
        ] {
            let mut msg = BusMessage::query(rca);
            msg.data = [0xAA; 8];
            assert_eq!(d.handle(&mut msg), DispatchOutcome::Ignored(reason));
            assert_eq!(msg.len, 0);
            assert_eq!(msg.data, [0xAA; 8]);
        }
    }

    #[test]
    fn readback_is_zero_before_any_command() {
        let (mut d, _, _) = dispatcher();
        let mut msg = BusMessage::query(0x01003);
        msg.data = [0xFF; 8];
        assert_eq!(d.handle(&mut msg), DispatchOutcome::ReadBack(ControlPoint::SetCryo4kTemperature));
        assert_eq!(msg.len, 4);
        assert_eq!(&msg.data[..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn denied_drive_is_still_recorded_for_readback() {
        let (mut d, state, outputs) = dispatcher();
        let mut msg = BusMessage::command(0x01001, &[0x01]);
        assert_eq!(
            d.handle(&mut msg),
            DispatchOutcome::Drive(GuardDecision::Denied { remaining_s: 301 })
        );
        assert!(!state.guard.is_on());
        assert!(!outputs.0.lock().drive);

        let mut q = BusMessage::query(0x01001);
        d.handle(&mut q);
        assert_eq!(q.payload(), &[0x01]);
    }

    #[test]
    fn applied_drive_sets_output_and_state_point() {
        let (mut d, state, outputs) = dispatcher();
        state.clock.advance(301);
        let mut msg = BusMessage::command(0x01001, &[0x7F]);
        assert_eq!(
            d.handle(&mut msg),
            DispatchOutcome::Drive(GuardDecision::Applied { on: true })
        );
        assert!(outputs.0.lock().drive);
        assert_eq!(state.store.read(StatusId::DriveState, 301), (StatusValue::Byte(1), 0));
    }

    #[test]
    fn failed_drive_output_commits_nothing() {
        let state = Arc::new(NodeState::new(DwellConfig { min_on_s: 180, min_off_s: 300 }));
        let mut d = Dispatcher::new(state.clone(), Box::new(FailingOutputs));
        state.clock.advance(301);
        let before = state.guard.snapshot();

        let mut msg = BusMessage::command(0x01001, &[1]);
        assert_eq!(
            d.handle(&mut msg),
            DispatchOutcome::OutputFault(ControlPoint::SetRemoteDrive)
        );
        assert!(!state.guard.is_on());
        assert_eq!(state.guard.snapshot(), before);
        assert_eq!(state.store.value(StatusId::DriveState), StatusValue::Byte(0));
        assert_eq!(state.store.last_update(StatusId::DriveState), Some(0));
        // Still OFF and past the rest time: elapsed-off keeps counting.
        assert_eq!(state.guard.time_since_power_off(301), 301);

        let mut reset = BusMessage::command(0x01002, &[1]);
        assert_eq!(
            d.handle(&mut reset),
            DispatchOutcome::OutputFault(ControlPoint::SetRemoteReset)
        );
    }

    #[test]
    fn short_payload_is_ignored_and_not_recorded() {
        let (mut d, state, _) = dispatcher();
        let mut msg = BusMessage::command(0x01003, &[0x40, 0x80]);
        assert_eq!(
            d.handle(&mut msg),
            DispatchOutcome::Ignored(IgnoreReason::ShortPayload { expected: 4, got: 2 })
        );
        assert_eq!(d.readback(ControlPoint::SetCryo4kTemperature), &[0, 0, 0, 0]);
        assert_eq!(state.store.last_update(StatusId::Cryo4kTemperature), None);

        let mut empty = BusMessage::command(0x01001, &[]);
        assert!(matches!(d.handle(&mut empty), DispatchOutcome::Ignored(_)));
    }

    #[test]
    fn push_writes_point_with_current_time() {
        let (mut d, state, _) = dispatcher();
        state.clock.advance(42);
        let mut msg = BusMessage::command(0x01003, &4.2f32.to_be_bytes());
        assert_eq!(
            d.handle(&mut msg),
            DispatchOutcome::Pushed {
                id: StatusId::Cryo4kTemperature,
                value: StatusValue::Float(4.2)
            }
        );
        assert_eq!(state.store.last_update(StatusId::Cryo4kTemperature), Some(42));

        let mut valve = BusMessage::command(0x01006, &[1]);
        d.handle(&mut valve);
        assert_eq!(state.store.value(StatusId::GateValveState), StatusValue::Byte(1));
    }

    #[test]
    fn reset_pulses_line_and_records_payload() {
        let (mut d, _, outputs) = dispatcher();
        let mut msg = BusMessage::command(0x01002, &[0x05]);
        assert_eq!(d.handle(&mut msg), DispatchOutcome::Reset);
        assert_eq!(outputs.0.lock().resets, 1);
        assert_eq!(d.readback(ControlPoint::SetRemoteReset), &[0x05]);
    }

    #[test]
    fn bypass_via_diagnostic_address() {
        let (mut d, state, _) = dispatcher();
        let mut msg = BusMessage::command(0x02000, &[1]);
        assert_eq!(d.handle(&mut msg), DispatchOutcome::Bypass(true));
        assert!(state.guard.bypass());

        let mut on = BusMessage::command(0x01001, &[1]);
        assert_eq!(
            d.handle(&mut on),
            DispatchOutcome::Drive(GuardDecision::Applied { on: true })
        );

        let mut q = BusMessage::query(0x02000);
        d.handle(&mut q);
        assert_eq!(q.payload(), &[1]);
    }
}
