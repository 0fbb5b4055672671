use ndarray::s;

use crate::masking::domain::region_masker::{MaskError, RegionMasker};
use crate::shared::frame::Frame;
use crate::shared::mask_region::MaskRegion;

use super::roi::RoiRect;

/// Fills the region with an opaque black rectangle.
pub struct SolidMasker;

impl RegionMasker for SolidMasker {
    fn apply(&self, frame: &mut Frame, region: &MaskRegion) -> Result<(), MaskError> {
        let rect = RoiRect::from_region(frame, region)?;
        let channels = frame.channels() as usize;
        // Gray or RGB colour channels go black; a trailing alpha channel goes opaque.
        let colour_channels = if channels >= 3 { 3 } else { 1 };

        let mut view = frame.as_ndarray_mut();
        let mut roi = view.slice_mut(s![rect.y..rect.y + rect.h, rect.x..rect.x + rect.w, ..]);
        roi.slice_mut(s![.., .., ..colour_channels]).fill(0);
        if channels > colour_channels {
            roi.slice_mut(s![.., .., colour_channels..]).fill(u8::MAX);
        }
        Ok(())
    }
}
