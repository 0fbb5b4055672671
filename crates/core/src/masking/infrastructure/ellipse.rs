/// Ellipse inscribed in a `width` x `height` ROI, stored as one column span
/// per row.
///
/// A pixel `(col, row)` is inside when its centre satisfies
/// `((col + 0.5 - w/2) / (w/2))^2 + ((row + 0.5 - h/2) / (h/2))^2 <= 1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EllipseMask {
    width: usize,
    height: usize,
    spans: Vec<(usize, usize)>,
}

impl EllipseMask {
    /// Returns `None` when the axes are degenerate or the ellipse covers no
    /// pixel; callers then replace the full rectangle instead.
    pub fn new(width: usize, height: usize) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let semi_a = width as f64 / 2.0;
        let semi_b = height as f64 / 2.0;

        let spans: Vec<(usize, usize)> = (0..height)
            .map(|row| {
                let dy = (row as f64 + 0.5 - semi_b) / semi_b;
                let inside = |col: usize| {
                    let dx = (col as f64 + 0.5 - semi_a) / semi_a;
                    dx * dx + dy * dy <= 1.0
                };
                match (0..width).find(|&col| inside(col)) {
                    Some(start) => {
                        let end = (start..width)
                            .rev()
                            .find(|&col| inside(col))
                            .map_or(start, |c| c + 1);
                        (start, end)
                    }
                    None => (0, 0),
                }
            })
            .collect();

        if spans.iter().all(|&(start, end)| end <= start) {
            return None;
        }
        Some(Self {
            width,
            height,
            spans,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, col: usize, row: usize) -> bool {
        self.spans
            .get(row)
            .is_some_and(|&(start, end)| col >= start && col < end)
    }

    /// Covered column range `start..end` of each row, top to bottom.
    pub fn spans(&self) -> &[(usize, usize)] {
        &self.spans
    }
}
