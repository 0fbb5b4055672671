//! In-memory collaborators for pipeline tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::batch_queue::{BatchSummary, Job};
use crate::pipeline::pipeline_observer::PipelineObserver;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::BoxError;
use crate::video::domain::media_backend::MediaBackend;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// `n` textured RGB frames with distinct content per index.
pub fn textured_frames(n: usize, width: u32, height: u32) -> Vec<Frame> {
    (0..n)
        .map(|i| {
            let data = (0..(width * height * 3) as usize)
                .map(|v| ((v * 7 + i * 13) % 256) as u8)
                .collect();
            Frame::new(data, width, height, 3, i)
        })
        .collect()
}

/// Serves a fixed list of frames; optionally fails to open or fails when
/// asked for frame `fail_at`.
pub struct MemoryReader {
    frames: Vec<Frame>,
    fps: f64,
    fail_open: bool,
    fail_at: Option<usize>,
    closed: Arc<AtomicBool>,
}

impl MemoryReader {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            fps: 30.0,
            fail_open: false,
            fail_at: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn still(frame: Frame) -> Self {
        Self {
            fps: 0.0,
            ..Self::new(vec![frame])
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

impl VideoReader for MemoryReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, BoxError> {
        if self.fail_open {
            return Err(format!("cannot decode {}", path.display()).into());
        }
        let (width, height) = self
            .frames
            .first()
            .map_or((0, 0), |f| (f.width(), f.height()));
        Ok(VideoMetadata {
            width,
            height,
            fps: self.fps,
            total_frames: self.frames.len(),
            codec: "memory".to_string(),
            source_path: Some(path.to_path_buf()),
        })
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, BoxError>> + '_> {
        let fail_at = self.fail_at;
        Box::new(self.frames.iter().cloned().enumerate().map(
            move |(i, f)| -> Result<Frame, BoxError> {
                if Some(i) == fail_at {
                    Err(format!("corrupt packet at frame {i}").into())
                } else {
                    Ok(f)
                }
            },
        ))
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

/// Records every written frame into a shared vector.
pub struct MemoryWriter {
    written: Arc<Mutex<Vec<Frame>>>,
    closed: Arc<AtomicBool>,
    fail_open: bool,
    fail_at: Option<usize>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self {
            written: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            fail_open: false,
            fail_at: None,
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new()
        }
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn written(&self) -> Arc<Mutex<Vec<Frame>>> {
        self.written.clone()
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

impl VideoWriter for MemoryWriter {
    fn open(&mut self, path: &Path, _metadata: &VideoMetadata) -> Result<(), BoxError> {
        if self.fail_open {
            return Err(format!("read-only location {}", path.display()).into());
        }
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), BoxError> {
        if Some(frame.index()) == self.fail_at {
            return Err("disk full".into());
        }
        self.written.lock().unwrap().push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// Reports the same boxes on every frame.
pub struct StubDetector {
    detections: Vec<Detection>,
}

impl StubDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }
}

impl FaceDetector for StubDetector {
    fn detect(&self, _frame: &Frame, threshold: f32) -> Result<Vec<Detection>, BoxError> {
        Ok(self
            .detections
            .iter()
            .filter(|d| d.score >= threshold)
            .copied()
            .collect())
    }
}

/// Fails on frame `fail_at`, returns nothing otherwise.
pub struct FailingDetector {
    pub fail_at: usize,
}

impl FaceDetector for FailingDetector {
    fn detect(&self, frame: &Frame, _threshold: f32) -> Result<Vec<Detection>, BoxError> {
        if frame.index() == self.fail_at {
            Err("inference backend crashed".into())
        } else {
            Ok(Vec::new())
        }
    }
}

/// Serves inputs from memory by path; unknown inputs fail to open.
#[derive(Default)]
pub struct MemoryBackend {
    inputs: HashMap<PathBuf, Vec<Frame>>,
    outputs: Arc<Mutex<HashMap<PathBuf, Vec<Frame>>>>,
}

impl MemoryBackend {
    pub fn with_input(mut self, path: impl Into<PathBuf>, frames: Vec<Frame>) -> Self {
        self.inputs.insert(path.into(), frames);
        self
    }

    pub fn outputs(&self) -> Arc<Mutex<HashMap<PathBuf, Vec<Frame>>>> {
        self.outputs.clone()
    }
}

impl MediaBackend for MemoryBackend {
    fn reader_for(&self, input: &Path) -> Box<dyn VideoReader> {
        match self.inputs.get(input) {
            Some(frames) if frames.len() == 1 => Box::new(MemoryReader::still(frames[0].clone())),
            Some(frames) => Box::new(MemoryReader::new(frames.clone())),
            None => Box::new(MemoryReader::failing_open()),
        }
    }

    fn writer_for(&self, output: &Path) -> Box<dyn VideoWriter> {
        Box::new(KeyedWriter {
            path: output.to_path_buf(),
            outputs: self.outputs.clone(),
        })
    }
}

struct KeyedWriter {
    path: PathBuf,
    outputs: Arc<Mutex<HashMap<PathBuf, Vec<Frame>>>>,
}

impl VideoWriter for KeyedWriter {
    fn open(&mut self, _path: &Path, _metadata: &VideoMetadata) -> Result<(), BoxError> {
        self.outputs.lock().unwrap().insert(self.path.clone(), Vec::new());
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), BoxError> {
        let mut outputs = self.outputs.lock().unwrap();
        outputs.entry(self.path.clone()).or_default().push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Records every event; optionally raises the cancel flag once `cancel_after`
/// frames have been masked.
#[derive(Default)]
pub struct RecordingObserver {
    pub progress: Vec<u8>,
    pub logs: Vec<String>,
    pub previews: Vec<usize>,
    pub masked_frames: usize,
    pub started: Vec<usize>,
    pub finished_jobs: Vec<usize>,
    pub summaries: Vec<BatchSummary>,
    pub cancel_after: Option<(usize, Arc<AtomicBool>)>,
}

impl RecordingObserver {
    pub fn cancelling_after(frames: usize, flag: Arc<AtomicBool>) -> Self {
        Self {
            cancel_after: Some((frames, flag)),
            ..Self::default()
        }
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_progress(&mut self, percent: u8) {
        self.progress.push(percent);
    }

    fn on_log(&mut self, message: &str) {
        self.logs.push(message.to_string());
    }

    fn on_frame(&mut self, _frame: &Frame, index: usize, _total: usize) {
        self.previews.push(index);
    }

    fn timing(&mut self, stage: &str, _duration_ms: f64) {
        if stage != "mask" {
            return;
        }
        self.masked_frames += 1;
        if let Some((k, flag)) = &self.cancel_after {
            if self.masked_frames == *k {
                flag.store(true, Ordering::Relaxed);
            }
        }
    }

    fn on_job_started(&mut self, index: usize, _total: usize, _job: &Job) {
        self.started.push(index);
    }

    fn on_job_finished(&mut self, index: usize, _job: &Job) {
        self.finished_jobs.push(index);
    }

    fn on_finished(&mut self, summary: &BatchSummary) {
        self.summaries.push(*summary);
    }
}
