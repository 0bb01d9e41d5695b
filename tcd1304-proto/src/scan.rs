//! Frame resynchronization over a raw byte stream.
//!
//! The device interleaves binary frames with ASCII response lines on the same
//! link. A reader accumulates whatever arrives and calls [`find_frame`] to
//! locate the next `FRME` marker, then drops [`FrameSearch::consumed`] bytes
//! from the front of its buffer.

use crate::frame::{FrameError, FrameView, FRAME_SIZE, START_MARKER};

/// Outcome of searching a byte stream for a frame.
#[derive(Debug, Clone, Copy)]
pub enum FrameSearch<'a> {
    /// A valid frame starts at `offset`.
    Found { offset: usize, frame: FrameView<'a> },
    /// A start marker at `offset` did not lead to a valid frame.
    Corrupt { offset: usize, error: FrameError },
    /// A start marker at `offset` but fewer than a frame's worth of bytes.
    Incomplete { offset: usize },
    /// No start marker; bytes before `keep_from` can be discarded.
    NotFound { keep_from: usize },
}

impl FrameSearch<'_> {
    /// Number of leading bytes the caller may discard.
    #[must_use]
    pub fn consumed(&self) -> usize {
        match *self {
            Self::Found { offset, .. } => offset + FRAME_SIZE,
            // Skip the false marker and search again
            Self::Corrupt { offset, .. } => offset + 1,
            Self::Incomplete { offset } => offset,
            Self::NotFound { keep_from } => keep_from,
        }
    }
}

/// Locate the first frame in `stream`.
#[must_use]
pub fn find_frame(stream: &[u8]) -> FrameSearch<'_> {
    let Some(offset) = stream
        .windows(START_MARKER.len())
        .position(|w| w == START_MARKER)
    else {
        // A marker may be split across reads; keep a possible prefix
        let keep_from = stream.len().saturating_sub(START_MARKER.len() - 1);
        return FrameSearch::NotFound { keep_from };
    };

    let Some(candidate) = stream.get(offset..offset + FRAME_SIZE) else {
        return FrameSearch::Incomplete { offset };
    };

    match FrameView::parse(candidate) {
        Ok(frame) => FrameSearch::Found { offset, frame },
        Err(error) => FrameSearch::Corrupt { offset, error },
    }
}
