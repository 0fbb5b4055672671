use std::path::PathBuf;

use thiserror::Error;

use crate::shared::BoxError;

/// Failure of one frame or one job. Terminates the current stream run; the
/// batch records it against the job and moves on.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("cannot create output {path}: {source}")]
    CreateSink {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("failed to read frame {frame}: {source}")]
    Read {
        frame: usize,
        #[source]
        source: BoxError,
    },
    #[error("failed to write frame {frame}: {source}")]
    Write {
        frame: usize,
        #[source]
        source: BoxError,
    },
    #[error("face detection failed on frame {frame}: {source}")]
    Detector {
        frame: usize,
        #[source]
        source: BoxError,
    },
    #[error("no face detector available: {source}")]
    DetectorUnavailable {
        #[source]
        source: BoxError,
    },
    #[error("frame {frame} is corrupt or empty ({width}x{height}x{channels}, {len} bytes)")]
    InvalidFrame {
        frame: usize,
        width: u32,
        height: u32,
        channels: u8,
        len: usize,
    },
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
    /// A worker thread panicked in an earlier run and took the reader or
    /// writer with it.
    #[error("stream endpoints were lost in an earlier run")]
    EndpointsUnavailable,
}
