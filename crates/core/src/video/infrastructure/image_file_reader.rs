use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::BoxError;
use crate::video::domain::video_reader::VideoReader;

/// Adapts a single image file to the [`VideoReader`] interface.
///
/// Treats the image as a one-frame video with `fps=0` and `total_frames=1`,
/// allowing the pipeline to process images and videos uniformly. Decodes with
/// the `image` crate into RGB8, so an untouched frame re-encodes to the same
/// pixels it was read from.
pub struct ImageFileReader {
    frame: Option<Frame>,
}

impl ImageFileReader {
    pub fn new() -> Self {
        Self { frame: None }
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for ImageFileReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, BoxError> {
        let img = image::open(path)?.into_rgb8();
        let (width, height) = img.dimensions();
        self.frame = Some(Frame::new(img.into_raw(), width, height, 3, 0));
        Ok(VideoMetadata::still_image(width, height, Some(path.to_path_buf())))
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, BoxError>> + '_> {
        match self.frame.take() {
            Some(frame) => Box::new(std::iter::once(Ok(frame))),
            None => Box::new(std::iter::once(Err("ImageFileReader: not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.frame = None;
    }
}

/// Loads a replacement image for the overlay method, keeping its alpha
/// channel when it has one.
pub fn load_overlay(path: &Path) -> Result<Frame, BoxError> {
    let img = image::open(path)?;
    let frame = if img.color().has_alpha() {
        let rgba = img.into_rgba8();
        let (w, h) = rgba.dimensions();
        Frame::new(rgba.into_raw(), w, h, 4, 0)
    } else {
        let rgb = img.into_rgb8();
        let (w, h) = rgb.dimensions();
        Frame::new(rgb.into_raw(), w, h, 3, 0)
    };
    log::debug!(
        "Loaded {}x{} overlay with {} channels from {}",
        frame.width(),
        frame.height(),
        frame.channels(),
        path.display()
    );
    Ok(frame)
}
