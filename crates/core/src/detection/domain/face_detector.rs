use crate::shared::detection::Detection;
use crate::shared::frame::Frame;
use crate::shared::BoxError;

/// Domain interface for face detection.
///
/// The inference backend is an external collaborator; the pipeline only
/// needs boxes and scores. Implementations must be pure with respect to
/// their inputs so one detector can serve several frames (and several
/// parallel image workers) at once. Only detections with
/// `score >= threshold` are returned.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &Frame, threshold: f32) -> Result<Vec<Detection>, BoxError>;
}
