use std::path::Path;

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::video::domain::media_backend::MediaBackend;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::ffmpeg_reader::FfmpegReader;
use super::ffmpeg_writer::FfmpegWriter;
use super::image_file_reader::ImageFileReader;
use super::image_file_writer::ImageFileWriter;

/// Returns true when the path's extension names a still-image format.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Picks `image`-crate adapters for still images and ffmpeg for everything else.
pub struct FileMediaBackend {
    keep_audio: bool,
}

impl FileMediaBackend {
    pub fn new() -> Self {
        Self { keep_audio: true }
    }

    pub fn with_audio(mut self, keep_audio: bool) -> Self {
        self.keep_audio = keep_audio;
        self
    }
}

impl Default for FileMediaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for FileMediaBackend {
    fn reader_for(&self, input: &Path) -> Box<dyn VideoReader> {
        if is_image(input) {
            Box::new(ImageFileReader::new())
        } else {
            Box::new(FfmpegReader::new())
        }
    }

    fn writer_for(&self, output: &Path) -> Box<dyn VideoWriter> {
        if is_image(output) {
            Box::new(ImageFileWriter::new())
        } else {
            Box::new(FfmpegWriter::new().with_audio(self.keep_audio))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("photo.jpg", true)]
    #[case("photo.JPEG", true)]
    #[case("scan.png", true)]
    #[case("scan.webp", true)]
    #[case("clip.mp4", false)]
    #[case("clip.MOV", false)]
    #[case("noext", false)]
    fn test_is_image(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_image(Path::new(name)), expected);
    }

    #[test]
    fn test_image_roundtrip_through_backend() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        image::RgbImage::from_pixel(6, 4, image::Rgb([9, 8, 7])).save(&input).unwrap();
        let output = dir.path().join("out/in_anonymized.png");

        let backend = FileMediaBackend::new();
        let mut reader = backend.reader_for(&input);
        let meta = reader.open(&input).unwrap();
        let frame = reader.frames().next().unwrap().unwrap();

        let mut writer = backend.writer_for(&output);
        writer.open(&output, &meta).unwrap();
        writer.write(&frame).unwrap();
        writer.close().unwrap();

        let img = image::open(&output).unwrap().into_rgb8();
        assert_eq!(img.get_pixel(5, 3).0, [9, 8, 7]);
    }
}
