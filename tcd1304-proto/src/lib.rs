//! Wire formats for the TCD1304 linear CCD readout firmware.
//!
//! This crate provides everything that crosses the USB link:
//!
//! - **Frames**: fixed-size binary records carrying one readout
//!   - [`FrameEncoder`] - Builds frames and owns the frame counter
//!   - [`validate_frame()`] / [`FrameView`] - Integrity checks and field access
//!   - [`find_frame()`] - Resynchronization over a mixed byte stream
//!   - [`checksum()`] - CRC-16/CCITT (poly `0x1021`, init `0xFFFF`)
//!
//! - **Commands**: newline-terminated ASCII lines from the host
//!   - [`parse_command()`] - Parse a line into a [`Command`]
//!
//! - **Responses**: newline-terminated ASCII lines to the host
//!   - [`Response`] - Response vocabulary and serialization
//!
//! # Frame Format
//!
//! ```text
//! "FRME" | counter:u16le | pixel_count:u16le | 3694 x sample:u16le | "ENDF" | crc16:u16le
//! ```
//!
//! 7402 bytes in total; the checksum covers the first 7400.
//!
//! # Examples
//!
//! ```
//! use tcd1304_proto::{FrameEncoder, FrameView, FRAME_SIZE, PIXEL_COUNT};
//!
//! let samples = [0x0800u16; PIXEL_COUNT];
//! let mut frame = [0u8; FRAME_SIZE];
//!
//! let mut encoder = FrameEncoder::new();
//! let counter = encoder.build(&samples, &mut frame).unwrap();
//!
//! let view = FrameView::parse(&frame).unwrap();
//! assert_eq!(view.counter(), counter);
//! assert_eq!(view.sample(0), Some(0x0800));
//! ```
//!
//! ```
//! use tcd1304_proto::{parse_command, Command};
//!
//! assert_eq!(parse_command(b"SET_INT_TIME:7500\r"), Command::SetIntegrationTime(7500));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//! - **`heapless`**: Enable `Response::serialize_to_vec()`

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod command;
pub mod crc;
mod fmt;
pub mod frame;
pub mod pixel;
pub mod response;
pub mod scan;

pub use command::{
    integration_time_in_range, parse_command, trim_command, Command, CMD_BUFFER_SIZE,
    DEFAULT_INTEGRATION_TIME_US, MAX_INTEGRATION_TIME_US, MIN_INTEGRATION_TIME_US,
};
pub use crc::{checksum, Crc16Digest, CRC16_INIT};
pub use frame::{
    validate_frame, FrameEncoder, FrameError, FrameView, END_MARKER, FRAME_SIZE, PIXEL_COUNT,
    START_MARKER,
};
pub use pixel::{PixelRegion, SIGNAL_PIXELS};
pub use response::{Response, SerializeError, MAX_RESPONSE_SIZE};
pub use scan::{find_frame, FrameSearch};
