use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::detection::domain::detector_provider::DetectorProvider;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::batch_queue::Job;
use crate::shared::constants::SIDECAR_SUFFIX;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;
use crate::shared::BoxError;

#[derive(Error, Debug)]
pub enum DetectionsFileError {
    #[error("failed to read detections file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse detections file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid frame index '{key}' in {path}")]
    FrameKey { path: PathBuf, key: String },
}

#[derive(Deserialize)]
struct DetectionsFile {
    /// Width of the frames the boxes were recorded on.
    #[serde(default)]
    width: Option<u32>,
    frames: HashMap<String, Vec<Detection>>,
}

/// Replays detections recorded by an external detector, keyed by frame index.
///
/// The threshold is applied at replay time, so one recording can be reused
/// with different confidence cut-offs. When the recording declares its frame
/// width, boxes are rescaled to the width of the frame being queried.
pub struct RecordedFaceDetector {
    frames: Arc<HashMap<usize, Vec<Detection>>>,
    source_width: Option<u32>,
}

impl RecordedFaceDetector {
    pub fn new(frames: HashMap<usize, Vec<Detection>>) -> Self {
        Self {
            frames: Arc::new(frames),
            source_width: None,
        }
    }

    pub fn with_source_width(mut self, width: u32) -> Self {
        self.source_width = (width > 0).then_some(width);
        self
    }

    /// Loads a `{"width": w, "frames": {"<index>": [detection, ...]}}` JSON
    /// document; `width` is optional.
    pub fn from_json_file(path: &Path) -> Result<Self, DetectionsFileError> {
        let text = fs::read_to_string(path).map_err(|e| DetectionsFileError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let parsed: DetectionsFile =
            serde_json::from_str(&text).map_err(|e| DetectionsFileError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut frames = HashMap::with_capacity(parsed.frames.len());
        for (key, dets) in parsed.frames {
            let index = key
                .trim()
                .parse::<usize>()
                .map_err(|_| DetectionsFileError::FrameKey {
                    path: path.to_path_buf(),
                    key: key.clone(),
                })?;
            frames.insert(index, dets);
        }
        log::debug!(
            "Loaded detections for {} frames from {}",
            frames.len(),
            path.display()
        );
        let detector = Self::new(frames);
        Ok(match parsed.width {
            Some(width) => detector.with_source_width(width),
            None => detector,
        })
    }

    pub fn source_width(&self) -> Option<u32> {
        self.source_width
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl FaceDetector for RecordedFaceDetector {
    fn detect(&self, frame: &Frame, threshold: f32) -> Result<Vec<Detection>, BoxError> {
        let factor = match self.source_width {
            Some(w) if w != frame.width() => f64::from(frame.width()) / f64::from(w),
            _ => 1.0,
        };
        Ok(self
            .frames
            .get(&frame.index())
            .map(|dets| {
                dets.iter()
                    .filter(|d| d.score >= threshold)
                    .map(|d| if factor == 1.0 { *d } else { d.scaled(factor) })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Path of the sidecar detections file for `input`: `<input>.faces.json`.
pub fn sidecar_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Loads each job's detections from the sidecar file next to its input.
pub struct SidecarDetectorProvider;

impl DetectorProvider for SidecarDetectorProvider {
    fn detector_for(&self, job: &Job) -> Result<Arc<dyn FaceDetector>, BoxError> {
        let detector = RecordedFaceDetector::from_json_file(&sidecar_path(job.input_path()))?;
        Ok(Arc::new(detector))
    }
}
