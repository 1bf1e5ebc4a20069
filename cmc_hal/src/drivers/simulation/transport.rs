//! Simulated serial transmitter.
//!
//! A transmit occupies the line for `10 bits × len / baud` seconds (8N1
//! framing). With a baud rate of zero the line stays busy until
//! [`SimulatedTransport::complete`] is called, which lets tests step the
//! transport by hand.

use cmc_common::consts::SER_TX_BUF_SIZE;
use cmc_common::hal::{HalError, Transport, TransportStatus};
use parking_lot::Mutex;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Bits on the wire per byte (start, 8 data, stop).
const BITS_PER_BYTE: u64 = 10;

#[derive(Debug, Default)]
struct TxState {
    /// End of the current transmission, timed mode.
    busy_until: Option<Instant>,
    /// Busy until completed by hand.
    held: bool,
    overrun: bool,
    lines: Vec<Vec<u8>>,
}

/// Serial transmitter with a single 80-byte buffer.
#[derive(Debug)]
pub struct SimulatedTransport {
    baud: u32,
    echo: bool,
    state: Mutex<TxState>,
}

impl SimulatedTransport {
    /// Transmitter timed at `baud`; zero selects manual completion.
    pub fn new(baud: u32, echo: bool) -> Self {
        Self {
            baud,
            echo,
            state: Mutex::new(TxState::default()),
        }
    }

    /// Finish the transmission in progress.
    pub fn complete(&self) {
        let mut state = self.state.lock();
        state.held = false;
        state.busy_until = None;
    }

    /// Hold the line busy, as if another sender owned it.
    pub fn hold(&self) {
        self.state.lock().held = true;
    }

    /// Everything transmitted so far, one entry per `transmit` call.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.lock().lines.clone()
    }

    /// Transmitted entries decoded as text.
    pub fn sent_lines(&self) -> Vec<String> {
        self.state
            .lock()
            .lines
            .iter()
            .map(|l| String::from_utf8_lossy(l).into_owned())
            .collect()
    }

    /// Clear the overrun flag.
    pub fn clear_overrun(&self) {
        self.state.lock().overrun = false;
    }

    fn transmission_time(&self, len: usize) -> Duration {
        let bits = BITS_PER_BYTE * len as u64;
        Duration::from_micros(bits * 1_000_000 / self.baud as u64)
    }
}

impl Transport for SimulatedTransport {
    fn status(&self) -> TransportStatus {
        let state = self.state.lock();
        let mut status = TransportStatus::empty();
        let timed_busy = state.busy_until.is_some_and(|until| Instant::now() < until);
        if state.held || timed_busy {
            status |= TransportStatus::TX_BUSY;
        }
        if state.overrun {
            status |= TransportStatus::TX_OVERRUN;
        }
        status
    }

    fn transmit(&self, bytes: &[u8]) -> Result<(), HalError> {
        if bytes.len() > SER_TX_BUF_SIZE {
            self.state.lock().overrun = true;
            warn!(len = bytes.len(), "Transmit buffer overrun");
            return Err(HalError::TxOverrun { len: bytes.len() });
        }
        if self.is_busy() {
            return Err(HalError::TransportBusy);
        }

        let mut state = self.state.lock();
        if self.baud == 0 {
            state.held = true;
        } else {
            state.busy_until = Some(Instant::now() + self.transmission_time(bytes.len()));
        }
        state.lines.push(bytes.to_vec());
        drop(state);

        trace!(len = bytes.len(), "transmit");
        if self.echo {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(bytes);
            let _ = out.flush();
        }
        Ok(())
    }
}
