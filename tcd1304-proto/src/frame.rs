//! Binary frame codec for one sensor readout.
//!
//! # Wire Format
//!
//! ```text
//! "FRME" | counter:u16le | pixel_count:u16le | samples:3694 x u16le | "ENDF" | crc:u16le
//! ```
//!
//! Every field is written explicitly in little-endian order, 7402 bytes in
//! total. The checksum is CRC-16/CCITT over the first 7400 bytes.

use core::ops::Range;

use crate::crc::{checksum, Crc16Digest};
use crate::pixel::PixelRegion;

/// Number of samples in one TCD1304 readout.
pub const PIXEL_COUNT: usize = 3694;

/// Start-of-frame marker.
pub const START_MARKER: [u8; 4] = *b"FRME";

/// End-of-frame marker.
pub const END_MARKER: [u8; 4] = *b"ENDF";

/// Header: start marker, frame counter, pixel count.
pub const HEADER_SIZE: usize = 8;

/// Footer: end marker, checksum.
pub const FOOTER_SIZE: usize = 6;

/// Total size of an encoded frame.
pub const FRAME_SIZE: usize = HEADER_SIZE + PIXEL_COUNT * 2 + FOOTER_SIZE;

const COUNTER_OFFSET: usize = 4;
const PIXEL_COUNT_OFFSET: usize = 6;
const SAMPLES: Range<usize> = HEADER_SIZE..HEADER_SIZE + PIXEL_COUNT * 2;
const END_MARKER_OFFSET: usize = SAMPLES.end;
const CHECKSUM_OFFSET: usize = FRAME_SIZE - 2;

/// Error type for frame operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Sample source or output buffer missing or too short.
    InvalidInput,
    /// Start or end marker does not match.
    InvalidData,
    /// Pixel count field or buffer length is not the fixed frame size.
    SizeMismatch,
    /// Stored checksum does not match the recomputed one.
    ChecksumMismatch,
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid input"),
            Self::InvalidData => write!(f, "frame marker mismatch"),
            Self::SizeMismatch => write!(f, "frame size mismatch"),
            Self::ChecksumMismatch => write!(f, "frame checksum mismatch"),
        }
    }
}

/// Output cursor that checksums everything it writes.
struct FrameBuf<'a> {
    buf: &'a mut [u8],
    pos: usize,
    crc: Crc16Digest,
}

impl<'a> FrameBuf<'a> {
    #[inline]
    fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            crc: Crc16Digest::new(),
        }
    }

    #[inline]
    fn write_slice(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.crc.update(bytes);
        self.pos = end;
    }

    #[inline]
    fn write_u16(&mut self, value: u16) {
        self.write_slice(&value.to_le_bytes());
    }

    /// Append the checksum (not itself checksummed). Returns bytes written.
    #[inline]
    fn finalize(self) -> usize {
        let crc = self.crc.finalize();
        self.buf[self.pos..self.pos + 2].copy_from_slice(&crc.to_le_bytes());
        self.pos + 2
    }
}

/// Frame builder that owns the running frame counter.
///
/// The counter advances (wrapping at 65536) on every successful build,
/// whether or not the frame is later transmitted.
#[derive(Debug, Default)]
pub struct FrameEncoder {
    counter: u16,
}

impl FrameEncoder {
    /// Create an encoder whose first frame is numbered zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Counter value the next frame will carry.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u16 {
        self.counter
    }

    /// Restart numbering at zero.
    pub fn reset_counter(&mut self) {
        self.counter = 0;
    }

    /// Encode one readout into `out[..FRAME_SIZE]`.
    ///
    /// Exactly [`PIXEL_COUNT`] samples are copied; extra samples are ignored
    /// and sample bits are passed through unmasked. Returns the counter value
    /// written into the frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidInput`] if `samples` holds fewer than
    /// [`PIXEL_COUNT`] values or `out` is shorter than [`FRAME_SIZE`]. The
    /// counter is not advanced in that case.
    pub fn build(&mut self, samples: &[u16], out: &mut [u8]) -> Result<u16, FrameError> {
        if samples.len() < PIXEL_COUNT || out.len() < FRAME_SIZE {
            return Err(FrameError::InvalidInput);
        }

        let counter = self.counter;
        let mut frame = FrameBuf::new(&mut out[..FRAME_SIZE]);
        frame.write_slice(&START_MARKER);
        frame.write_u16(counter);
        frame.write_u16(PIXEL_COUNT as u16);
        for &sample in &samples[..PIXEL_COUNT] {
            frame.write_u16(sample);
        }
        frame.write_slice(&END_MARKER);
        let written = frame.finalize();
        debug_assert_eq!(written, FRAME_SIZE);

        self.counter = counter.wrapping_add(1);
        Ok(counter)
    }
}

#[inline]
fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

/// Check the integrity of an encoded frame.
///
/// Checks run in order: markers, pixel count, checksum. The frame is never
/// modified.
///
/// # Errors
///
/// - [`FrameError::SizeMismatch`] if `bytes` is not exactly [`FRAME_SIZE`]
///   long or the pixel count field is not [`PIXEL_COUNT`]
/// - [`FrameError::InvalidData`] if either marker is wrong
/// - [`FrameError::ChecksumMismatch`] if the checksum does not match
pub fn validate_frame(bytes: &[u8]) -> Result<(), FrameError> {
    if bytes.len() != FRAME_SIZE {
        return Err(FrameError::SizeMismatch);
    }
    if bytes[..START_MARKER.len()] != START_MARKER
        || bytes[END_MARKER_OFFSET..END_MARKER_OFFSET + END_MARKER.len()] != END_MARKER
    {
        return Err(FrameError::InvalidData);
    }
    if usize::from(read_u16(bytes, PIXEL_COUNT_OFFSET)) != PIXEL_COUNT {
        return Err(FrameError::SizeMismatch);
    }
    if checksum(&bytes[..CHECKSUM_OFFSET]) != read_u16(bytes, CHECKSUM_OFFSET) {
        return Err(FrameError::ChecksumMismatch);
    }
    Ok(())
}

/// Validated, zero-copy view of an encoded frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    bytes: &'a [u8; FRAME_SIZE],
}

impl<'a> FrameView<'a> {
    /// Validate `bytes` and wrap them.
    ///
    /// # Errors
    ///
    /// Same as [`validate_frame`].
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FrameError> {
        validate_frame(bytes)?;
        let bytes = bytes.try_into().map_err(|_| FrameError::SizeMismatch)?;
        Ok(Self { bytes })
    }

    /// The raw encoded frame.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Frame counter.
    #[must_use]
    pub fn counter(&self) -> u16 {
        read_u16(self.bytes, COUNTER_OFFSET)
    }

    /// Pixel count field (always [`PIXEL_COUNT`] for a valid frame).
    #[must_use]
    pub fn pixel_count(&self) -> u16 {
        read_u16(self.bytes, PIXEL_COUNT_OFFSET)
    }

    /// Stored checksum.
    #[must_use]
    pub fn checksum(&self) -> u16 {
        read_u16(self.bytes, CHECKSUM_OFFSET)
    }

    /// Sample at `index`, or `None` past the end.
    #[must_use]
    pub fn sample(&self, index: usize) -> Option<u16> {
        (index < PIXEL_COUNT).then(|| read_u16(self.bytes, SAMPLES.start + index * 2))
    }

    /// All samples in readout order.
    pub fn samples(&self) -> impl Iterator<Item = u16> + 'a {
        let bytes: &'a [u8] = &self.bytes[SAMPLES];
        bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Samples of one pixel region.
    pub fn region(&self, region: PixelRegion) -> impl Iterator<Item = u16> + 'a {
        let range = region.range();
        self.samples().skip(range.start).take(range.len())
    }

    /// The photosensitive pixels (S0-S3647).
    pub fn signal_pixels(&self) -> impl Iterator<Item = u16> + 'a {
        self.region(PixelRegion::Signal)
    }
}
