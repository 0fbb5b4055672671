use crate::shared::detection::Detection;
use crate::shared::mask_region::MaskRegion;

/// Box as `(x1, y1, x2, y2)` in integer pixel coordinates.
pub type IntBox = (i32, i32, i32, i32);

/// Expands a detection box symmetrically by `mask_scale - 1` of its own
/// width/height on every side, rounding half away from zero.
///
/// Detector coordinates are truncated toward zero to whole pixels before
/// scaling, so `mask_scale == 1.0` returns the truncated input box.
/// Non-finite coordinates collapse to an empty box.
pub fn scale_box(det: &Detection, mask_scale: f64) -> IntBox {
    let s = mask_scale - 1.0;
    let [x1, y1, x2, y2] = [det.x1, det.y1, det.x2, det.y2].map(f64::trunc);
    let w = x2 - x1;
    let h = y2 - y1;
    let coords = [x1 - w * s, y1 - h * s, x2 + w * s, y2 + h * s];
    if coords.iter().any(|c| !c.is_finite()) {
        return (0, 0, 0, 0);
    }
    let [x1, y1, x2, y2] = coords.map(round_to_i32);
    (x1, y1, x2, y2)
}

/// Clamps `x` into `[0, frame_w - 1]` and `y` into `[0, frame_h - 1]`.
///
/// Boxes lying entirely outside the frame collapse to zero area; callers
/// must skip regions for which [`MaskRegion::is_empty`] holds.
pub fn clip_box(bbox: IntBox, frame_w: u32, frame_h: u32) -> MaskRegion {
    if frame_w == 0 || frame_h == 0 {
        return MaskRegion::new(0, 0, 0, 0);
    }
    let max_x = i32::try_from(frame_w - 1).unwrap_or(i32::MAX);
    let max_y = i32::try_from(frame_h - 1).unwrap_or(i32::MAX);
    let (x1, y1, x2, y2) = bbox;
    MaskRegion::new(
        x1.clamp(0, max_x),
        y1.clamp(0, max_y),
        x2.clamp(0, max_x),
        y2.clamp(0, max_y),
    )
}

fn round_to_i32(v: f64) -> i32 {
    // `as` saturates at the i32 bounds, which the clamp in `clip_box` absorbs.
    v.round() as i32
}

/// Converts detector boxes into frame-bounded mask regions.
#[derive(Clone, Copy, Debug)]
pub struct MaskRegionBuilder {
    mask_scale: f64,
}

impl MaskRegionBuilder {
    pub fn new(mask_scale: f64) -> Self {
        Self { mask_scale }
    }

    /// Scales then clips `det`; `None` when the result has no area.
    pub fn build(&self, det: &Detection, frame_w: u32, frame_h: u32) -> Option<MaskRegion> {
        let region = clip_box(scale_box(det, self.mask_scale), frame_w, frame_h);
        (!region.is_empty()).then_some(region)
    }
}
