use crate::masking::domain::region_masker::{MaskError, RegionMasker};
use crate::shared::frame::Frame;
use crate::shared::mask_region::MaskRegion;

use super::box_blur::{self, BlurParams};
use super::ellipse::EllipseMask;
use super::roi::{self, RoiRect};

/// Blurs the region with repeated box passes sized from the region itself.
///
/// With `use_ellipse`, only pixels inside the inscribed ellipse receive the
/// blurred values; the rest of the rectangle keeps its original bytes.
pub struct BlurMasker {
    intensity: u8,
    use_ellipse: bool,
}

impl BlurMasker {
    pub fn new(intensity: u8, use_ellipse: bool) -> Self {
        Self {
            intensity,
            use_ellipse,
        }
    }
}

impl RegionMasker for BlurMasker {
    fn apply(&self, frame: &mut Frame, region: &MaskRegion) -> Result<(), MaskError> {
        let rect = RoiRect::from_region(frame, region)?;
        let fw = frame.width() as usize;
        let channels = frame.channels() as usize;
        let data = frame.data_mut();

        let mut roi = Vec::new();
        let mut temp = Vec::new();
        roi::extract_roi(data, fw, channels, rect, &mut roi);
        let params = BlurParams::for_region(rect.w, rect.h, self.intensity);
        box_blur::blur_roi(&mut roi, rect.w, rect.h, channels, &params, &mut temp);

        if !self.use_ellipse {
            roi::write_roi_back(data, &roi, fw, channels, rect);
            return Ok(());
        }

        match EllipseMask::new(rect.w, rect.h) {
            Some(mask) => composite_ellipse(data, &roi, fw, channels, rect, &mask),
            None => {
                log::debug!(
                    "Ellipse mask unavailable for {}x{} region, blurring full rectangle",
                    rect.w,
                    rect.h
                );
                roi::write_roi_back(data, &roi, fw, channels, rect);
            }
        }
        Ok(())
    }
}

/// Write blurred pixels back to the frame only within the ellipse mask.
fn composite_ellipse(
    data: &mut [u8],
    roi: &[u8],
    frame_width: usize,
    channels: usize,
    rect: RoiRect,
    mask: &EllipseMask,
) {
    for (row, &(start, end)) in mask.spans().iter().enumerate() {
        if end <= start {
            continue;
        }
        let frame_offset = ((rect.y + row) * frame_width + rect.x + start) * channels;
        let roi_offset = (row * rect.w + start) * channels;
        let len = (end - start) * channels;
        data[frame_offset..frame_offset + len].copy_from_slice(&roi[roi_offset..roi_offset + len]);
    }
}
