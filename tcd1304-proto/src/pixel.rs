//! TCD1304 pixel map.
//!
//! A readout carries 3694 elements: 32 leading dummy, shielded and transition
//! outputs, 3648 photosensitive pixels, then 14 trailing outputs.

use core::ops::Range;

use crate::frame::PIXEL_COUNT;

/// Index range of the photosensitive pixels S0-S3647.
pub const SIGNAL_PIXELS: Range<usize> = 32..3680;

/// Named region of a readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelRegion {
    /// D0-D15.
    LeadingDummy,
    /// D16-D28, light-shielded.
    LightShield,
    /// D29-D31.
    LeadingTransition,
    /// S0-S3647.
    Signal,
    /// D32-D34.
    TrailingTransition,
    /// D35-D45.
    TrailingDummy,
}

impl PixelRegion {
    /// All regions in readout order.
    pub const ALL: [PixelRegion; 6] = [
        Self::LeadingDummy,
        Self::LightShield,
        Self::LeadingTransition,
        Self::Signal,
        Self::TrailingTransition,
        Self::TrailingDummy,
    ];

    /// Sample index range covered by this region.
    #[must_use]
    pub const fn range(self) -> Range<usize> {
        match self {
            Self::LeadingDummy => 0..16,
            Self::LightShield => 16..29,
            Self::LeadingTransition => 29..SIGNAL_PIXELS.start,
            Self::Signal => SIGNAL_PIXELS,
            Self::TrailingTransition => SIGNAL_PIXELS.end..3683,
            Self::TrailingDummy => 3683..PIXEL_COUNT,
        }
    }

    /// Region containing sample `index`.
    #[must_use]
    pub fn of(index: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.range().contains(&index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regions_tile_the_readout() {
        let mut next = 0;
        for region in PixelRegion::ALL {
            let range = region.range();
            assert_eq!(range.start, next);
            next = range.end;
        }
        assert_eq!(next, PIXEL_COUNT);
        assert_eq!(PixelRegion::Signal.range().len(), 3648);
    }

    #[test]
    fn test_region_lookup() {
        assert_eq!(PixelRegion::of(0), Some(PixelRegion::LeadingDummy));
        assert_eq!(PixelRegion::of(31), Some(PixelRegion::LeadingTransition));
        assert_eq!(PixelRegion::of(32), Some(PixelRegion::Signal));
        assert_eq!(PixelRegion::of(3693), Some(PixelRegion::TrailingDummy));
        assert_eq!(PixelRegion::of(PIXEL_COUNT), None);
    }
}
