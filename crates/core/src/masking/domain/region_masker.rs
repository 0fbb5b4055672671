use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::mask_region::MaskRegion;

/// Failure to mask one region. The frame processor logs it and moves on to
/// the next region, so a bad detection never aborts the frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaskError {
    #[error("region {region:?} does not fit a {width}x{height} frame")]
    RegionOutOfBounds {
        region: MaskRegion,
        width: u32,
        height: u32,
    },
    #[error("no overlay image configured")]
    MissingOverlay,
    #[error("overlay has {0} channels, expected 3 (RGB) or 4 (RGBA)")]
    OverlayChannels(u8),
    #[error("cannot composite an overlay onto a {0}-channel frame")]
    FrameChannels(u8),
    #[error("overlay image is malformed ({width}x{height}, {len} bytes)")]
    MalformedOverlay { width: u32, height: u32, len: usize },
    #[error("overlay resize to {width}x{height} failed")]
    OverlayResize { width: u32, height: u32 },
}

/// Domain interface for redacting a single region of a frame.
///
/// Implementations modify the frame in-place and touch no pixel outside
/// `region`.
pub trait RegionMasker: Send + Sync {
    fn apply(&self, frame: &mut Frame, region: &MaskRegion) -> Result<(), MaskError>;
}
