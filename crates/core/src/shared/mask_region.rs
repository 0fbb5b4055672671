/// A detection box after scaling and clipping to the frame.
///
/// Coordinates are half-open: pixels `x1..x2` by `y1..y2`. A region with
/// `x2 <= x1` or `y2 <= y1` is empty and must never be masked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskRegion {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl MaskRegion {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// True when the region lies entirely within a `frame_w` x `frame_h` frame.
    pub fn fits_within(&self, frame_w: u32, frame_h: u32) -> bool {
        self.x1 >= 0
            && self.y1 >= 0
            && i64::from(self.x2) <= i64::from(frame_w)
            && i64::from(self.y2) <= i64::from(frame_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_dimensions() {
        let r = MaskRegion::new(10, 20, 40, 70);
        assert_eq!(r.width(), 30);
        assert_eq!(r.height(), 50);
        assert!(!r.is_empty());
    }

    #[rstest]
    #[case::zero_width(MaskRegion::new(5, 5, 5, 10))]
    #[case::zero_height(MaskRegion::new(5, 5, 10, 5))]
    #[case::inverted(MaskRegion::new(10, 10, 5, 5))]
    fn test_degenerate_regions_are_empty(#[case] r: MaskRegion) {
        assert!(r.is_empty());
        assert!(r.width() == 0 || r.height() == 0);
    }

    #[test]
    fn test_fits_within() {
        assert!(MaskRegion::new(0, 0, 100, 50).fits_within(100, 50));
        assert!(!MaskRegion::new(0, 0, 101, 50).fits_within(100, 50));
        assert!(!MaskRegion::new(-1, 0, 10, 10).fits_within(100, 50));
    }
}
