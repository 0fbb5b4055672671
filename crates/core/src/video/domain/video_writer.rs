use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::shared::BoxError;

/// Append-only sink for processed frames.
///
/// Frames are written in call order by a single owner; the pipeline never
/// shares a writer between threads.
pub trait VideoWriter: Send {
    /// Creates the output, including any missing parent directories.
    fn open(&mut self, path: &Path, metadata: &VideoMetadata) -> Result<(), BoxError>;

    fn write(&mut self, frame: &Frame) -> Result<(), BoxError>;

    /// Flushes and finalizes the output. Audio passthrough happens here.
    fn close(&mut self) -> Result<(), BoxError>;
}
