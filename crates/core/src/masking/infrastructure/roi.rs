use crate::masking::domain::region_masker::MaskError;
use crate::shared::frame::Frame;
use crate::shared::mask_region::MaskRegion;

/// ROI rectangle within a frame, in unsigned pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl RoiRect {
    /// Validates `region` against the frame and converts it.
    pub fn from_region(frame: &Frame, region: &MaskRegion) -> Result<Self, MaskError> {
        if region.is_empty() || !region.fits_within(frame.width(), frame.height()) {
            return Err(MaskError::RegionOutOfBounds {
                region: *region,
                width: frame.width(),
                height: frame.height(),
            });
        }
        Ok(Self {
            x: region.x1 as usize,
            y: region.y1 as usize,
            w: region.width() as usize,
            h: region.height() as usize,
        })
    }
}

/// Copy a rectangular ROI out of frame data into a reusable buffer.
pub fn extract_roi(
    data: &[u8],
    frame_width: usize,
    channels: usize,
    rect: RoiRect,
    roi: &mut Vec<u8>,
) {
    roi.resize(rect.w * rect.h * channels, 0);
    let row_len = rect.w * channels;
    for row in 0..rect.h {
        let src_offset = ((rect.y + row) * frame_width + rect.x) * channels;
        let dst_offset = row * row_len;
        roi[dst_offset..dst_offset + row_len]
            .copy_from_slice(&data[src_offset..src_offset + row_len]);
    }
}

/// Write a processed ROI buffer back into frame data.
pub fn write_roi_back(
    data: &mut [u8],
    roi: &[u8],
    frame_width: usize,
    channels: usize,
    rect: RoiRect,
) {
    let row_len = rect.w * channels;
    for row in 0..rect.h {
        let dst_offset = ((rect.y + row) * frame_width + rect.x) * channels;
        let src_offset = row * row_len;
        data[dst_offset..dst_offset + row_len]
            .copy_from_slice(&roi[src_offset..src_offset + row_len]);
    }
}
