//! Reporting cadence.
//!
//! Emits one text line per status point, in enumeration order, cycling
//! forever. Lines are spaced by at least `spacing_ms`. A line is only handed
//! to the transport while it is idle; if the spacing has elapsed while the
//! transport is busy the same line goes out as soon as it frees. Nothing is
//! dropped and at most one line leaves per poll.

use core::fmt::Write;

use cmc_common::consts::{ELAPSED_NOT_APPLICABLE, SER_TX_BUF_SIZE};
use cmc_common::hal::Transport;
use cmc_common::status::{PumpState, StatusId, StatusValue, ValveState};
use heapless::String;
use tracing::{trace, warn};

use crate::state::NodeState;

/// One report line, sized to the transmit buffer.
pub type ReportLine = String<SER_TX_BUF_SIZE>;

/// Result of a [`ReportingCadence::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceStep {
    /// Spacing not yet elapsed.
    Idle,
    /// Line due but the transport is not available.
    Waiting,
    /// Line for this point handed to the transport.
    Emitted(StatusId),
}

/// Cycling line reporter. Owned by the main thread.
#[derive(Debug)]
pub struct ReportingCadence {
    spacing_ms: u64,
    next: usize,
    last_emit_ms: Option<u64>,
}

impl ReportingCadence {
    pub fn new(spacing_ms: u64) -> Self {
        Self {
            spacing_ms,
            next: 0,
            last_emit_ms: None,
        }
    }

    /// Point reported by the next emission.
    #[inline]
    pub fn next_point(&self) -> StatusId {
        StatusId::ALL[self.next]
    }

    /// Emit the next line if it is due and the transport is idle.
    ///
    /// `now_ms` is a monotonic millisecond reading; only differences are
    /// used.
    pub fn poll(&mut self, now_ms: u64, state: &NodeState, transport: &dyn Transport) -> CadenceStep {
        let spacing = self.spacing_ms;
        if self
            .last_emit_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < spacing)
        {
            return CadenceStep::Idle;
        }
        if transport.is_busy() {
            return CadenceStep::Waiting;
        }

        let id = self.next_point();
        let (value, age) = state.read_point(id, state.now());
        let mut line = ReportLine::new();
        format_line(id, value, age, &mut line);

        if let Err(e) = transport.transmit(line.as_bytes()) {
            warn!(point = %id, "Report line not sent: {e}");
            return CadenceStep::Waiting;
        }

        trace!(point = %id, "report line");
        self.last_emit_ms = Some(now_ms);
        self.next = (self.next + 1) % StatusId::ALL.len();
        CadenceStep::Emitted(id)
    }
}

// ─── Formatting ─────────────────────────────────────────────────────

/// Render `LABEL value [unit] age=N` followed by CR LF into `out`.
///
/// Falls back to `LABEL ?` if the rendered line would not fit.
pub fn format_line(id: StatusId, value: StatusValue, age: u8, out: &mut ReportLine) {
    out.clear();
    if write_line(id, value, age, out).is_err() {
        out.clear();
        // Shortest label plus "?\r\n" fits well inside the buffer.
        let _ = write!(out, "{} ?\r\n", id.label());
    }
}

fn write_line(id: StatusId, value: StatusValue, age: u8, out: &mut ReportLine) -> core::fmt::Result {
    use StatusId::*;

    write!(out, "{} ", id.label())?;
    match (id, value) {
        (Temp1 | Temp2 | Temp3 | Temp4 | AmbientTemperature, StatusValue::Float(v)) => {
            write!(out, "{v:.2} C")?
        }
        (Aux1 | Aux2, StatusValue::Float(v)) => write!(out, "{v:.3} V")?,
        (Pressure, StatusValue::Float(v)) => write!(out, "{v:.3} MPa")?,
        (Cryo4kTemperature | Cryo15kTemperature, StatusValue::Float(v)) => write!(out, "{v:.2} K")?,
        (CryostatPressure, StatusValue::Float(v)) => write!(out, "{v:.2e} mbar")?,
        (DriveState, StatusValue::Byte(b)) => out.write_str(if b != 0 { "ON" } else { "OFF" })?,
        (GateValveState, StatusValue::Byte(b)) => match ValveState::from_u8(b) {
            Some(state) => out.write_str(state.label())?,
            None => write!(out, "UNKNOWN({b})")?,
        },
        (BackingPumpState, StatusValue::Byte(b)) => match PumpState::from_u8(b) {
            Some(state) => out.write_str(state.label())?,
            None => write!(out, "UNKNOWN({b})")?,
        },
        (TimeSincePowerOn | TimeSincePowerOff, StatusValue::Unsigned(s)) => {
            if s == ELAPSED_NOT_APPLICABLE {
                out.write_str("n/a")?
            } else {
                write!(out, "{} min", s / 60)?
            }
        }
        (_, other) => write!(out, "{other}")?,
    }
    write!(out, " age={age}\r\n")
}

// ─── Tests ──────────────────────────────────────────────────────────
