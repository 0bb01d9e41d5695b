//! Response line serialization.
//!
//! Every response is one ASCII line terminated by `\n`:
//!
//! ```text
//! TCD1304_READY
//! OK:STARTED
//! OK:STOPPED
//! STATUS:<RUNNING|IDLE>,INT_TIME:<us>
//! OK:INT_TIME_SET:<us>
//! ERROR:MUST_STOP_FIRST
//! ERROR:RANGE_10_TO_100000
//! ERROR:CMD_TOO_LONG
//! ERROR:UNKNOWN_CMD:<text>
//! ```
//!
//! # Example
//!
//! ```
//! use tcd1304_proto::Response;
//!
//! let mut buf = [0u8; 64];
//! let len = Response::Status { running: false, integration_time_us: 20 }
//!     .serialize(&mut buf)
//!     .unwrap();
//! assert_eq!(&buf[..len], b"STATUS:IDLE,INT_TIME:20\n");
//! ```

use crate::command::CMD_BUFFER_SIZE;
use crate::fmt::{write_u32, MAX_U32_DIGITS};

const UNKNOWN_PREFIX: &[u8] = b"ERROR:UNKNOWN_CMD:";

/// Maximum size of a serialized response.
///
/// The longest line echoes an unknown command of up to `CMD_BUFFER_SIZE - 1`
/// characters after its prefix, plus the newline.
pub const MAX_RESPONSE_SIZE: usize = UNKNOWN_PREFIX.len() + CMD_BUFFER_SIZE;

/// Error type for serialization operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerializeError {
    /// The output buffer is too small to hold the serialized message.
    BufferTooSmall,
}

impl core::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

/// A response line sent to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response<'a> {
    /// Sent once at startup.
    Ready,
    Started,
    Stopped,
    Status {
        running: bool,
        integration_time_us: u32,
    },
    IntegrationTimeSet(u32),
    /// Integration time change refused while acquiring.
    MustStopFirst,
    /// Integration time outside 10..=100000 us.
    OutOfRange,
    /// Command accumulator overflowed.
    CommandTooLong,
    /// Unrecognized command, echoing its trimmed text.
    UnknownCommand(&'a [u8]),
}

/// Bounds-checked output cursor.
struct LineBuf<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> LineBuf<'a> {
    #[inline]
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    fn write_slice(&mut self, bytes: &[u8]) -> Result<(), SerializeError> {
        let end = self.pos + bytes.len();
        self.buf
            .get_mut(self.pos..end)
            .ok_or(SerializeError::BufferTooSmall)?
            .copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    #[inline]
    fn write_u32(&mut self, value: u32) -> Result<(), SerializeError> {
        let mut tmp = [0u8; MAX_U32_DIGITS];
        let len = write_u32(&mut tmp, value);
        self.write_slice(&tmp[..len])
    }

    #[inline]
    fn finish(mut self) -> Result<usize, SerializeError> {
        self.write_slice(b"\n")?;
        Ok(self.pos)
    }
}

impl Response<'_> {
    /// Serialize to the provided buffer, newline included.
    ///
    /// Returns the number of bytes written on success.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::BufferTooSmall`] if the buffer is not large enough.
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, SerializeError> {
        let mut out = LineBuf::new(buf);
        match *self {
            Self::Ready => out.write_slice(b"TCD1304_READY")?,
            Self::Started => out.write_slice(b"OK:STARTED")?,
            Self::Stopped => out.write_slice(b"OK:STOPPED")?,
            Self::Status {
                running,
                integration_time_us,
            } => {
                out.write_slice(b"STATUS:")?;
                let state: &[u8] = if running { b"RUNNING" } else { b"IDLE" };
                out.write_slice(state)?;
                out.write_slice(b",INT_TIME:")?;
                out.write_u32(integration_time_us)?;
            }
            Self::IntegrationTimeSet(us) => {
                out.write_slice(b"OK:INT_TIME_SET:")?;
                out.write_u32(us)?;
            }
            Self::MustStopFirst => out.write_slice(b"ERROR:MUST_STOP_FIRST")?,
            Self::OutOfRange => out.write_slice(b"ERROR:RANGE_10_TO_100000")?,
            Self::CommandTooLong => out.write_slice(b"ERROR:CMD_TOO_LONG")?,
            Self::UnknownCommand(text) => {
                out.write_slice(UNKNOWN_PREFIX)?;
                out.write_slice(text)?;
            }
        }
        out.finish()
    }

    /// Serialize to a `heapless::Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::BufferTooSmall`] if `N` is not large enough.
    #[cfg(feature = "heapless")]
    pub fn serialize_to_vec<const N: usize>(&self) -> Result<heapless::Vec<u8, N>, SerializeError> {
        let mut vec = heapless::Vec::new();
        vec.resize(N, 0)
            .map_err(|_| SerializeError::BufferTooSmall)?;
        let len = self.serialize(&mut vec)?;
        vec.truncate(len);
        Ok(vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(response: Response<'_>) -> ([u8; MAX_RESPONSE_SIZE], usize) {
        let mut buf = [0u8; MAX_RESPONSE_SIZE];
        let len = response.serialize(&mut buf).unwrap();
        (buf, len)
    }

    #[test]
    fn test_fixed_responses() {
        let cases: [(Response<'_>, &[u8]); 7] = [
            (Response::Ready, &b"TCD1304_READY\n"[..]),
            (Response::Started, &b"OK:STARTED\n"[..]),
            (Response::Stopped, &b"OK:STOPPED\n"[..]),
            (Response::MustStopFirst, &b"ERROR:MUST_STOP_FIRST\n"[..]),
            (Response::OutOfRange, &b"ERROR:RANGE_10_TO_100000\n"[..]),
            (Response::CommandTooLong, &b"ERROR:CMD_TOO_LONG\n"[..]),
            (Response::IntegrationTimeSet(50_000), &b"OK:INT_TIME_SET:50000\n"[..]),
        ];
        for (response, expected) in cases {
            let (buf, len) = line(response);
            assert_eq!(&buf[..len], expected);
        }
    }

    #[test]
    fn test_status() {
        let (buf, len) = line(Response::Status {
            running: true,
            integration_time_us: 7500,
        });
        assert_eq!(&buf[..len], b"STATUS:RUNNING,INT_TIME:7500\n");
    }

    #[test]
    fn test_unknown_echoes_longest_command() {
        let text = [b'X'; CMD_BUFFER_SIZE - 1];
        let (buf, len) = line(Response::UnknownCommand(&text));
        assert_eq!(len, MAX_RESPONSE_SIZE);
        assert!(buf[..len].starts_with(b"ERROR:UNKNOWN_CMD:XXX"));
        assert_eq!(buf[len - 1], b'\n');
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buf = [0u8; 10];
        assert_eq!(
            Response::Started.serialize(&mut buf),
            Err(SerializeError::BufferTooSmall)
        );
        let mut buf = [0u8; 10];
        assert_eq!(
            Response::Stopped.serialize(&mut buf),
            Err(SerializeError::BufferTooSmall)
        );
    }
}
