use std::sync::Arc;

use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::batch_queue::Job;
use crate::shared::BoxError;

/// Hands each batch job the detector it should run with.
///
/// Lets a caller share one in-process detector across the batch, or bind a
/// job to detections produced for that specific input.
pub trait DetectorProvider: Send + Sync {
    fn detector_for(&self, job: &Job) -> Result<Arc<dyn FaceDetector>, BoxError>;
}

/// Gives every job the same detector instance.
pub struct SharedDetector {
    detector: Arc<dyn FaceDetector>,
}

impl SharedDetector {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self { detector }
    }
}

impl DetectorProvider for SharedDetector {
    fn detector_for(&self, _job: &Job) -> Result<Arc<dyn FaceDetector>, BoxError> {
        Ok(self.detector.clone())
    }
}
