use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::BoxError;
use crate::video::domain::video_writer::VideoWriter;

/// Writes the single frame of an image job using the `image` crate.
///
/// The output format follows the path's extension.
pub struct ImageFileWriter {
    path: Option<PathBuf>,
    written: bool,
}

impl ImageFileWriter {
    pub fn new() -> Self {
        Self {
            path: None,
            written: false,
        }
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for ImageFileWriter {
    fn open(&mut self, path: &Path, _metadata: &VideoMetadata) -> Result<(), BoxError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.path = Some(path.to_path_buf());
        self.written = false;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), BoxError> {
        let path = self.path.as_deref().ok_or("ImageFileWriter: not opened")?;
        if self.written {
            return Err("ImageFileWriter: an image output holds a single frame".into());
        }
        save_frame(path, frame)?;
        self.written = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.path = None;
        Ok(())
    }
}

fn save_frame(path: &Path, frame: &Frame) -> Result<(), BoxError> {
    let (w, h) = (frame.width(), frame.height());
    let data = frame.data().to_vec();
    let invalid = || -> BoxError { format!("frame buffer does not match {w}x{h}").into() };
    match frame.channels() {
        1 => image::GrayImage::from_raw(w, h, data).ok_or_else(invalid)?.save(path)?,
        3 => image::RgbImage::from_raw(w, h, data).ok_or_else(invalid)?.save(path)?,
        4 => image::RgbaImage::from_raw(w, h, data).ok_or_else(invalid)?.save(path)?,
        other => return Err(format!("cannot save a {other}-channel frame").into()),
    }
    Ok(())
}
