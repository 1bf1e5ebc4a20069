//! Console peer: a line-oriented text front end to the bus.
//!
//! ```text
//! q <rca>                 query, e.g. `q 0x00001`
//! c <rca> <hex bytes>     command, e.g. `c 0x01001 01` or `c 1003 40866666`
//! e                       latched facility status
//! e clear                 clear the facility status
//! help
//! quit
//! ```
//!
//! Addresses and payloads are hexadecimal, with or without `0x`.

use cmc_common::bus::BusMessage;
use cmc_common::consts::{MAX_PAYLOAD, RCA_MASK};
use std::fmt::Write;
use thiserror::Error;

use crate::dispatch::DispatchOutcome;

pub const HELP: &str = "commands: q <rca> | c <rca> <hex bytes> | e [clear] | help | quit";

/// Parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Bus(BusMessage),
    FacilityStatus,
    ClearFacilityStatus,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    #[error("empty line")]
    Empty,

    #[error("unknown command '{0}', try 'help'")]
    UnknownCommand(String),

    #[error("missing {0}")]
    MissingArgument(&'static str),

    #[error("invalid address '{0}'")]
    BadAddress(String),

    #[error("invalid payload '{0}': expected up to 8 hex bytes")]
    BadPayload(String),
}

/// Parse one console line.
pub fn parse_line(line: &str) -> Result<ConsoleCommand, PeerError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(PeerError::Empty);
    };

    match verb.to_ascii_lowercase().as_str() {
        "q" => {
            let rca = parse_address(words.next())?;
            Ok(ConsoleCommand::Bus(BusMessage::query(rca)))
        }
        "c" => {
            let rca = parse_address(words.next())?;
            let hex: String = words.collect();
            let payload = parse_payload(&hex)?;
            Ok(ConsoleCommand::Bus(BusMessage::command(rca, &payload)))
        }
        "e" => match words.next() {
            Some("clear") => Ok(ConsoleCommand::ClearFacilityStatus),
            _ => Ok(ConsoleCommand::FacilityStatus),
        },
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(PeerError::UnknownCommand(other.to_string())),
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

fn parse_address(word: Option<&str>) -> Result<u32, PeerError> {
    let word = word.ok_or(PeerError::MissingArgument("address"))?;
    match u32::from_str_radix(strip_hex_prefix(word), 16) {
        Ok(rca) if rca <= RCA_MASK => Ok(rca),
        _ => Err(PeerError::BadAddress(word.to_string())),
    }
}

fn parse_payload(hex: &str) -> Result<Vec<u8>, PeerError> {
    let digits = strip_hex_prefix(hex);
    if digits.len() % 2 != 0 || digits.len() / 2 > MAX_PAYLOAD || !digits.is_ascii() {
        return Err(PeerError::BadPayload(hex.to_string()));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
        .collect::<Result<_, _>>()
        .map_err(|_| PeerError::BadPayload(hex.to_string()))
}

/// Render a dispatched message and what the dispatcher did with it.
pub fn format_response(msg: &BusMessage, outcome: &DispatchOutcome) -> String {
    let mut out = msg.to_string();
    let _ = match outcome {
        DispatchOutcome::Monitor { id, value, age } => write!(out, "  {id} = {value} (age {age} min)"),
        DispatchOutcome::ReadBack(point) => write!(out, "  read-back {point:?}"),
        DispatchOutcome::Drive(decision) => write!(out, "  drive {decision:?}"),
        DispatchOutcome::Reset => write!(out, "  reset pulsed"),
        DispatchOutcome::Pushed { id, value } => write!(out, "  {id} <- {value}"),
        DispatchOutcome::Bypass(on) => write!(out, "  guard bypass {}", if *on { "on" } else { "off" }),
        DispatchOutcome::OutputFault(point) => write!(out, "  output fault on {point:?}"),
        DispatchOutcome::Ignored(reason) => write!(out, "  ignored: {reason:?}"),
    };
    out
}

/// Render the 8-byte facility status record.
pub fn format_facility_status(status: &[u8; 8]) -> String {
    if status.iter().all(|&b| b == 0) {
        return "no error latched".to_string();
    }
    format!(
        "{} {} facility={} code={} (0x{:02x})",
        String::from_utf8_lossy(&status[..3]),
        String::from_utf8_lossy(&status[3..7]).trim_end(),
        status[7] >> 5,
        status[7] & 0x1F,
        status[7]
    )
}

// ─── Tests ──────────────────────────────────────────────────────────
