use std::path::Path;

use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Chooses reader and writer adapters for a job's input and output paths.
pub trait MediaBackend: Send + Sync {
    fn reader_for(&self, input: &Path) -> Box<dyn VideoReader>;

    fn writer_for(&self, output: &Path) -> Box<dyn VideoWriter>;
}
