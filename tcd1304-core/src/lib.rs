//! Platform-agnostic transport and command handling for TCD1304 readout
//! firmware.
//!
//! This crate holds everything between the USB link and the sensor driver
//! that does not depend on a particular chip, so it builds for the target
//! as `no_std` and tests on the host.
//!
//! # Overview
//!
//! - [`ring`]: Lock-free single-producer, single-consumer byte queue ([`ByteChannel`])
//! - [`transport`]: Queued and bulk output plus line input ([`TransportState`], [`Transport`])
//! - [`processor`]: ASCII command state machine ([`CommandProcessor`])
//! - [`readout`]: Frame building and publishing ([`ReadoutPublisher`])
//! - [`link`] / [`timer`]: Collaborator traits implemented by the firmware
//!   ([`Link`], [`IntegrationTimer`])
//!
//! # Execution contexts
//!
//! The link layer runs in an event context (interrupt or USB task) and only
//! ever holds a [`LinkReceiver`] and a [`SendComplete`]. Everything else runs
//! in a single polled loop:
//!
//! ```text
//! loop {
//!     processor.poll(&mut transport);
//!     publisher.publish(samples, processor.state(), &mut transport)?;
//!     transport.process();
//! }
//! ```
//!
//! # Example
//!
//! ```rust
//! use tcd1304_core::{CommandProcessor, IntegrationTimer, Link, TransportState};
//!
//! struct Loopback(Vec<u8>);
//!
//! impl Link for Loopback {
//!     fn transmit(&mut self, bytes: &[u8]) -> bool {
//!         self.0.extend_from_slice(bytes);
//!         true
//!     }
//! }
//!
//! struct NoTimer;
//!
//! impl IntegrationTimer for NoTimer {
//!     fn reconfigure(&mut self, _period_ticks: u32, _pulse_ticks: u32) {}
//!     fn restart(&mut self) {}
//! }
//!
//! let mut state: TransportState = TransportState::new();
//! let (mut receiver, complete, mut transport) = state.split(Loopback(Vec::new()));
//! let mut processor = CommandProcessor::new(NoTimer);
//!
//! receiver.receive_from_link(b"STATUS\r\n");
//! processor.poll(&mut transport);
//! transport.process();
//! complete.on_link_send_complete();
//!
//! assert_eq!(transport.link().0, b"STATUS:IDLE,INT_TIME:20\n");
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt logging and formatting (for embedded logging)
//! - **`critical-section`**: Atomics through `critical-section` on cores
//!   without compare-and-swap

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// macros, must come first
#[macro_use]
mod log;

pub mod link;
pub mod processor;
pub mod readout;
pub mod ring;
pub mod timer;
pub mod transport;

pub use link::Link;
pub use processor::{AcquisitionState, CommandError, CommandPort, CommandProcessor};
pub use readout::{ReadoutOutcome, ReadoutPublisher};
pub use ring::{ByteChannel, Consumer, Producer};
pub use timer::{IntegrationTimer, TimerConfig};
pub use transport::{
    LinkReceiver, SendComplete, Transport, TransportError, TransportState, TransportStats,
    CHUNK_SIZE, RX_BUFFER_SIZE, TX_BUFFER_SIZE,
};

// Re-export protocol types for convenience
pub use tcd1304_proto::{
    Command, FrameEncoder, FrameError, Response, CMD_BUFFER_SIZE, DEFAULT_INTEGRATION_TIME_US,
    FRAME_SIZE, MAX_INTEGRATION_TIME_US, MIN_INTEGRATION_TIME_US, PIXEL_COUNT,
};
