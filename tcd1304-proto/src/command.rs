//! ASCII command grammar.
//!
//! Commands are case-sensitive keywords terminated by `\n`, `\r` or `\r\n`:
//!
//! ```text
//! START
//! STOP
//! STATUS
//! SET_INT_TIME:<digits>
//! ```

use crate::fmt::parse_leading_u32;

/// Capacity of the command accumulator, terminator excluded.
///
/// At most `CMD_BUFFER_SIZE - 1` characters fit in one command.
pub const CMD_BUFFER_SIZE: usize = 64;

/// Shortest accepted integration time in microseconds.
pub const MIN_INTEGRATION_TIME_US: u32 = 10;

/// Longest accepted integration time in microseconds.
pub const MAX_INTEGRATION_TIME_US: u32 = 100_000;

/// Integration time in effect after reset.
pub const DEFAULT_INTEGRATION_TIME_US: u32 = 20;

const SET_INT_TIME_PREFIX: &[u8] = b"SET_INT_TIME:";

/// A parsed command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    Start,
    Stop,
    Status,
    /// Requested integration time. Missing or non-numeric text parses as 0.
    SetIntegrationTime(u32),
    /// Anything else, holding the trimmed text.
    Unknown(&'a [u8]),
}

/// Strip trailing spaces and carriage returns.
#[must_use]
pub fn trim_command(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b' ' && b != b'\r')
        .map_or(0, |i| i + 1);
    &line[..end]
}

/// Parse one command line (terminator already removed).
pub fn parse_command(line: &[u8]) -> Command<'_> {
    let line = trim_command(line);
    match line {
        b"START" => Command::Start,
        b"STOP" => Command::Stop,
        b"STATUS" => Command::Status,
        _ => match line.strip_prefix(SET_INT_TIME_PREFIX) {
            Some(param) => Command::SetIntegrationTime(parse_leading_u32(param)),
            None => Command::Unknown(line),
        },
    }
}

/// Whether `us` is an acceptable integration time.
#[inline]
#[must_use]
pub fn integration_time_in_range(us: u32) -> bool {
    (MIN_INTEGRATION_TIME_US..=MAX_INTEGRATION_TIME_US).contains(&us)
}
