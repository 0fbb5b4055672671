use serde::{Deserialize, Serialize};

/// A face box reported by the detector, in source-frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub score: f32,
}

impl Detection {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, score: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    /// Multiplies all coordinates by `factor`, keeping the score.
    ///
    /// Maps boxes found on a downscaled copy back to full resolution.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x1: self.x1 * factor,
            y1: self.y1 * factor,
            x2: self.x2 * factor,
            y2: self.y2 * factor,
            score: self.score,
        }
    }
}
