use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel, Rgb, Rgba};

use crate::masking::domain::region_masker::{MaskError, RegionMasker};
use crate::shared::frame::Frame;
use crate::shared::mask_region::MaskRegion;

use super::roi::RoiRect;

/// Pastes a replacement image over the region, stretched to fit.
///
/// RGB overlays replace the region outright. RGBA overlays are alpha
/// composited: `out = (dst * (255 - a) + src * a + 127) / 255`, which is exact
/// for fully transparent and fully opaque pixels.
pub struct OverlayMasker {
    overlay: Option<Arc<Frame>>,
}

impl OverlayMasker {
    pub fn new(overlay: Option<Arc<Frame>>) -> Self {
        Self { overlay }
    }
}

impl RegionMasker for OverlayMasker {
    fn apply(&self, frame: &mut Frame, region: &MaskRegion) -> Result<(), MaskError> {
        let overlay = self.overlay.as_deref().ok_or(MaskError::MissingOverlay)?;
        let rect = RoiRect::from_region(frame, region)?;
        let oc = overlay.channels();
        if oc != 3 && oc != 4 {
            return Err(MaskError::OverlayChannels(oc));
        }
        if !overlay.is_valid() {
            return Err(MaskError::MalformedOverlay {
                width: overlay.width(),
                height: overlay.height(),
                len: overlay.data().len(),
            });
        }
        let fc = frame.channels() as usize;
        if fc < 3 {
            return Err(MaskError::FrameChannels(frame.channels()));
        }

        let resized = resize_overlay(overlay, rect.w as u32, rect.h as u32)?;
        let oc = oc as usize;
        let fw = frame.width() as usize;
        let data = frame.data_mut();

        for row in 0..rect.h {
            for col in 0..rect.w {
                let src = &resized[(row * rect.w + col) * oc..][..oc];
                let dst_offset = ((rect.y + row) * fw + rect.x + col) * fc;
                let dst = &mut data[dst_offset..dst_offset + 3];
                if oc == 4 {
                    let a = u32::from(src[3]);
                    for c in 0..3 {
                        dst[c] = blend(dst[c], src[c], a);
                    }
                } else {
                    dst.copy_from_slice(&src[..3]);
                }
            }
        }
        Ok(())
    }
}

fn blend(dst: u8, src: u8, alpha: u32) -> u8 {
    ((u32::from(dst) * (255 - alpha) + u32::from(src) * alpha + 127) / 255) as u8
}

/// Resizes the overlay's raw bytes to `width` x `height`, reusing them when
/// the size already matches.
fn resize_overlay(overlay: &Frame, width: u32, height: u32) -> Result<Vec<u8>, MaskError> {
    if overlay.width() == width && overlay.height() == height {
        return Ok(overlay.data().to_vec());
    }
    let err = || MaskError::OverlayResize { width, height };
    match overlay.channels() {
        3 => resize_buffer::<Rgb<u8>>(overlay, width, height).ok_or_else(err),
        4 => resize_buffer::<Rgba<u8>>(overlay, width, height).ok_or_else(err),
        other => Err(MaskError::OverlayChannels(other)),
    }
}

fn resize_buffer<P>(overlay: &Frame, width: u32, height: u32) -> Option<Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let src: ImageBuffer<P, Vec<u8>> =
        ImageBuffer::from_raw(overlay.width(), overlay.height(), overlay.data().to_vec())?;
    Some(imageops::resize(&src, width, height, FilterType::Triangle).into_raw())
}
