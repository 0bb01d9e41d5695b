//! Frame publishing for completed readouts.

use tcd1304_proto::{validate_frame, FrameEncoder, FrameError, FRAME_SIZE};

use crate::link::Link;
use crate::processor::AcquisitionState;
use crate::transport::{Transport, TransportError};

/// What happened to one readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadoutOutcome {
    /// Frame handed to the link.
    Sent { counter: u16 },
    /// Acquisition idle; frame built but not sent.
    Skipped { counter: u16 },
    /// Frame could not be handed off.
    Dropped { counter: u16, error: TransportError },
}

/// Builds frames from readouts and sends them through the bulk path.
///
/// The frame counter advances for every readout, sent or not, so gaps in
/// the counter seen by the host mean dropped or skipped frames.
pub struct ReadoutPublisher {
    encoder: FrameEncoder,
    frame: [u8; FRAME_SIZE],
}

impl ReadoutPublisher {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            encoder: FrameEncoder::new(),
            frame: [0; FRAME_SIZE],
        }
    }

    /// Encode `samples` and, while `state` is running, bulk-send the frame.
    ///
    /// # Errors
    ///
    /// [`FrameError::InvalidInput`] if fewer than 3694 samples are given. The
    /// counter does not advance in that case.
    pub fn publish<L: Link, const RX: usize, const TX: usize>(
        &mut self,
        samples: &[u16],
        state: AcquisitionState,
        transport: &mut Transport<'_, L, RX, TX>,
    ) -> Result<ReadoutOutcome, FrameError> {
        let counter = self.encoder.build(samples, &mut self.frame)?;

        if state == AcquisitionState::Idle {
            return Ok(ReadoutOutcome::Skipped { counter });
        }
        match transport.send_bulk(&self.frame) {
            Ok(()) => {
                trace!("frame {} sent", counter);
                Ok(ReadoutOutcome::Sent { counter })
            }
            Err(error) => {
                debug!("frame {} dropped: {}", counter, error);
                Ok(ReadoutOutcome::Dropped { counter, error })
            }
        }
    }

    /// Re-check the last built frame.
    ///
    /// # Errors
    ///
    /// The validation failure, if the buffer was corrupted after encoding.
    pub fn verify(&self) -> Result<(), FrameError> {
        validate_frame(&self.frame).inspect_err(|error| {
            warn!("frame validation failed: {}", error);
        })
    }

    /// The last built frame.
    #[must_use]
    pub fn frame(&self) -> &[u8; FRAME_SIZE] {
        &self.frame
    }

    /// Counter value the next frame will carry.
    #[must_use]
    pub fn frame_count(&self) -> u16 {
        self.encoder.frame_count()
    }

    pub fn reset_counter(&mut self) {
        self.encoder.reset_counter();
    }
}

impl Default for ReadoutPublisher {
    fn default() -> Self {
        Self::new()
    }
}
