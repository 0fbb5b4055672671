use ndarray::s;

use crate::masking::domain::region_masker::{MaskError, RegionMasker};
use crate::shared::frame::Frame;
use crate::shared::mask_region::MaskRegion;

use super::roi::RoiRect;

/// Flat-block mosaic: the region is cut into `cell_size` squares anchored at
/// its top-left corner and each square takes the colour of its own top-left
/// pixel. Cells on the right and bottom edges are clipped to the region.
pub struct MosaicMasker {
    cell_size: usize,
}

impl MosaicMasker {
    pub fn new(cell_size: u32) -> Self {
        Self {
            cell_size: (cell_size as usize).max(1),
        }
    }
}

impl RegionMasker for MosaicMasker {
    fn apply(&self, frame: &mut Frame, region: &MaskRegion) -> Result<(), MaskError> {
        let rect = RoiRect::from_region(frame, region)?;
        let mut view = frame.as_ndarray_mut();

        for y in (rect.y..rect.y + rect.h).step_by(self.cell_size) {
            let y_end = (y + self.cell_size).min(rect.y + rect.h);
            for x in (rect.x..rect.x + rect.w).step_by(self.cell_size) {
                let x_end = (x + self.cell_size).min(rect.x + rect.w);
                let colour = view.slice(s![y, x, ..]).to_owned();
                view.slice_mut(s![y..y_end, x..x_end, ..]).assign(&colour);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[
                    (x * 7 % 256) as u8,
                    (y * 5 % 256) as u8,
                    ((x + y) % 256) as u8,
                ]);
            }
        }
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_every_cell_matches_its_top_left_source_pixel() {
        let mut frame = gradient(50, 40);
        let original = frame.clone();
        let region = MaskRegion::new(3, 4, 45, 37);
        let size = 8u32;
        MosaicMasker::new(size).apply(&mut frame, &region).unwrap();

        for y in 4..37u32 {
            for x in 3..45u32 {
                let cell_x = 3 + (x - 3) / size * size;
                let cell_y = 4 + (y - 4) / size * size;
                assert_eq!(frame.pixel(x, y), original.pixel(cell_x, cell_y), "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_pixels_outside_region_unchanged() {
        let mut frame = gradient(30, 30);
        let original = frame.clone();
        MosaicMasker::new(7).apply(&mut frame, &MaskRegion::new(5, 5, 20, 20)).unwrap();
        for y in 0..30u32 {
            for x in 0..30u32 {
                if !((5..20).contains(&x) && (5..20).contains(&y)) {
                    assert_eq!(frame.pixel(x, y), original.pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn test_cell_larger_than_region_is_single_block() {
        let mut frame = gradient(20, 20);
        let original = frame.clone();
        MosaicMasker::new(100).apply(&mut frame, &MaskRegion::new(2, 2, 12, 9)).unwrap();
        for y in 2..9u32 {
            for x in 2..12u32 {
                assert_eq!(frame.pixel(x, y), original.pixel(2, 2));
            }
        }
    }

    #[test]
    fn test_cell_size_one_is_identity() {
        let mut frame = gradient(16, 16);
        let original = frame.clone();
        MosaicMasker::new(1).apply(&mut frame, &MaskRegion::new(0, 0, 16, 16)).unwrap();
        assert_eq!(frame, original);
    }
}
