use std::path::PathBuf;

/// Stream-level facts a source reader exposes before the first frame.
///
/// `total_frames` is 0 when the container does not report a frame count;
/// the pipeline then streams without intermediate progress.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Metadata of a still image: a one-frame stream with `fps = 0`.
    pub fn still_image(width: u32, height: u32, source_path: Option<PathBuf>) -> Self {
        Self {
            width,
            height,
            fps: 0.0,
            total_frames: 1,
            codec: String::new(),
            source_path,
        }
    }

    pub fn is_still_image(&self) -> bool {
        self.fps == 0.0 && self.total_frames == 1
    }
}
