use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_observer::PipelineObserver;
use crate::pipeline::progress_throttle::ProgressThrottle;
use crate::shared::constants::{HEARTBEAT_INTERVAL, PREVIEW_EVERY_FRAMES};
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Opening,
    Streaming,
    Completed,
    Stopped,
    Failed,
}

/// How a stream run that did not fail ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamStatus {
    Completed,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamReport {
    pub status: StreamStatus,
    pub frames_written: usize,
    /// Frame count the source reported up front; 0 when unknown.
    pub total_frames: usize,
}

/// A frame with its detections, on its way from the detect thread to the
/// masking loop.
struct Detected {
    frame: Frame,
    detections: Vec<Detection>,
    detect_ms: f64,
}

struct LoopEnd {
    frames_written: usize,
    cancelled: bool,
}

enum LoopError {
    Pipeline(PipelineError),
    /// The writer thread hung up; its own result carries the cause.
    WriterGone,
}

/// Drives one source through detection and masking into one sink.
///
/// Layout: `reader -> detect -> main [mask/progress/preview] -> writer`.
///
/// Reading and detection run ahead of masking on their own threads, but the
/// main loop is the only place frames are counted and cancellation is
/// honoured, and the single writer thread receives frames in read order.
/// Images run through the same machinery as one-frame streams.
pub struct StreamController {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    processor: Arc<FrameProcessor>,
    cancelled: Arc<AtomicBool>,
    state: StreamState,
    channel_capacity: usize,
}

impl StreamController {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        processor: FrameProcessor,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            processor: Arc::new(processor),
            cancelled,
            state: StreamState::Idle,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Streams `input` into `output`, blocking until the run ends.
    ///
    /// Cancellation yields `Ok` with [`StreamStatus::Stopped`]; the output
    /// then holds every frame masked before the flag was seen and must be
    /// treated as provisional.
    pub fn run(
        &mut self,
        input: &Path,
        output: &Path,
        observer: &mut dyn PipelineObserver,
    ) -> Result<StreamReport, PipelineError> {
        self.state = StreamState::Opening;
        let result = self.open_and_stream(input, output, observer);
        self.state = match &result {
            Ok(report) if report.status == StreamStatus::Completed => StreamState::Completed,
            Ok(_) => StreamState::Stopped,
            Err(_) => StreamState::Failed,
        };
        result
    }

    fn open_and_stream(
        &mut self,
        input: &Path,
        output: &Path,
        observer: &mut dyn PipelineObserver,
    ) -> Result<StreamReport, PipelineError> {
        let (mut reader, mut writer) = match (self.reader.take(), self.writer.take()) {
            (Some(reader), Some(writer)) => (reader, writer),
            (reader, writer) => {
                self.reader = reader;
                self.writer = writer;
                return Err(PipelineError::EndpointsUnavailable);
            }
        };

        let metadata = match open_endpoints(&mut *reader, &mut *writer, input, output) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.reader = Some(reader);
                self.writer = Some(writer);
                return Err(e);
            }
        };

        self.state = StreamState::Streaming;
        observer.on_log(&format!(
            "Processing {} ({}x{}, {} frames)",
            input.display(),
            metadata.width,
            metadata.height,
            metadata.total_frames
        ));

        let cap = self.channel_capacity;
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, PipelineError>>(cap);
        let (detected_tx, detected_rx) =
            crossbeam_channel::bounded::<Result<Detected, PipelineError>>(cap);
        let (write_tx, write_rx) = crossbeam_channel::bounded::<Frame>(cap);

        let reader_handle = spawn_reader(reader, frame_tx, self.cancelled.clone());
        let detect_handle = spawn_detector(
            self.processor.clone(),
            frame_rx,
            detected_tx,
            self.cancelled.clone(),
        );
        let writer_handle = spawn_writer(writer, write_rx);

        let mut throttle = ProgressThrottle::default();
        let main_result = run_main_loop(
            detected_rx,
            &write_tx,
            &self.processor,
            &self.cancelled,
            &metadata,
            &mut throttle,
            observer,
        );

        drop(write_tx);

        let end = join_threads(
            reader_handle,
            detect_handle,
            writer_handle,
            main_result,
            &mut self.reader,
            &mut self.writer,
        )?;

        let status = if end.cancelled {
            observer.on_log(&format!(
                "Stopped after {} frames; {} is incomplete",
                end.frames_written,
                output.display()
            ));
            StreamStatus::Stopped
        } else {
            if let Some(percent) = throttle.finish() {
                observer.on_progress(percent);
            }
            observer.on_log(&format!(
                "Wrote {} frames to {}",
                end.frames_written,
                output.display()
            ));
            StreamStatus::Completed
        };

        Ok(StreamReport {
            status,
            frames_written: end.frames_written,
            total_frames: metadata.total_frames,
        })
    }
}

/// Creates the output directory, then opens source and sink. A sink that
/// cannot be opened releases the already opened source.
fn open_endpoints(
    reader: &mut dyn VideoReader,
    writer: &mut dyn VideoWriter,
    input: &Path,
    output: &Path,
) -> Result<VideoMetadata, PipelineError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::CreateSink {
            path: output.to_path_buf(),
            source: e.into(),
        })?;
    }

    let metadata = reader.open(input).map_err(|source| PipelineError::Open {
        path: input.to_path_buf(),
        source,
    })?;

    if let Err(source) = writer.open(output, &metadata) {
        reader.close();
        return Err(PipelineError::CreateSink {
            path: output.to_path_buf(),
            source,
        });
    }
    Ok(metadata)
}

fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    frame_tx: Sender<Result<Frame, PipelineError>>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<Box<dyn VideoReader>> {
    std::thread::spawn(move || {
        for (index, frame_result) in reader.frames().enumerate() {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let failed = frame_result.is_err();
            let mapped = frame_result.map_err(|source| PipelineError::Read {
                frame: index,
                source,
            });
            if frame_tx.send(mapped).is_err() || failed {
                break;
            }
        }
        reader.close();
        reader
    })
}

fn spawn_detector(
    processor: Arc<FrameProcessor>,
    frame_rx: Receiver<Result<Frame, PipelineError>>,
    detected_tx: Sender<Result<Detected, PipelineError>>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for frame_result in frame_rx {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let result = frame_result.and_then(|frame| {
                let start = Instant::now();
                let detections = processor.detect(&frame)?;
                Ok(Detected {
                    frame,
                    detections,
                    detect_ms: elapsed_ms(start),
                })
            });
            let failed = result.is_err();
            if detected_tx.send(result).is_err() || failed {
                break;
            }
        }
    })
}

/// Returns the writer together with how many frames it wrote, or the write
/// failure that ended it.
fn spawn_writer(
    mut writer: Box<dyn VideoWriter>,
    write_rx: Receiver<Frame>,
) -> JoinHandle<(Box<dyn VideoWriter>, Result<usize, PipelineError>)> {
    std::thread::spawn(move || {
        let mut written = 0;
        for frame in write_rx {
            if let Err(source) = writer.write(&frame) {
                let err = PipelineError::Write {
                    frame: frame.index(),
                    source,
                };
                return (writer, Err(err));
            }
            written += 1;
        }
        (writer, Ok(written))
    })
}

/// Receives detected frames in read order, masks them, reports progress and
/// forwards them to the writer. Checks the cancel flag once per frame.
fn run_main_loop(
    detected_rx: Receiver<Result<Detected, PipelineError>>,
    write_tx: &Sender<Frame>,
    processor: &FrameProcessor,
    cancelled: &AtomicBool,
    metadata: &VideoMetadata,
    throttle: &mut ProgressThrottle,
    observer: &mut dyn PipelineObserver,
) -> Result<LoopEnd, LoopError> {
    let total = metadata.total_frames;
    let still = metadata.is_still_image();
    let mut counted = 0usize;
    let mut last_heartbeat = Instant::now();

    for detected in detected_rx {
        if cancelled.load(Ordering::Relaxed) {
            return Ok(LoopEnd {
                frames_written: counted,
                cancelled: true,
            });
        }

        let Detected {
            mut frame,
            detections,
            detect_ms,
        } = detected.map_err(LoopError::Pipeline)?;

        let start = Instant::now();
        processor.apply(&mut frame, &detections);
        let mask_ms = elapsed_ms(start);

        if still || (counted + 1) % PREVIEW_EVERY_FRAMES == 0 {
            observer.on_frame(&frame, frame.index(), total);
        }

        if write_tx.send(frame).is_err() {
            return Err(LoopError::WriterGone);
        }
        counted += 1;

        observer.timing("detect", detect_ms);
        observer.timing("mask", mask_ms);

        if !still {
            if let Some(percent) = throttle.update(counted, total) {
                observer.on_progress(percent);
            }
        }

        if last_heartbeat.elapsed() >= HEARTBEAT_INTERVAL {
            observer.on_log(&format!("Still processing... (current frame: {counted})"));
            last_heartbeat = Instant::now();
        }
    }

    Ok(LoopEnd {
        frames_written: counted,
        cancelled: cancelled.load(Ordering::Relaxed),
    })
}

/// Joins all stream threads, hands the reader and writer back to their slots
/// and coalesces the first error encountered.
fn join_threads(
    reader_handle: JoinHandle<Box<dyn VideoReader>>,
    detect_handle: JoinHandle<()>,
    writer_handle: JoinHandle<(Box<dyn VideoWriter>, Result<usize, PipelineError>)>,
    main_result: Result<LoopEnd, LoopError>,
    reader_slot: &mut Option<Box<dyn VideoReader>>,
    writer_slot: &mut Option<Box<dyn VideoWriter>>,
) -> Result<LoopEnd, PipelineError> {
    fn set_if_none(slot: &mut Option<PipelineError>, err: PipelineError) {
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    let mut first_error = None;
    let end = match main_result {
        Ok(end) => Some(end),
        Err(LoopError::Pipeline(e)) => {
            first_error = Some(e);
            None
        }
        Err(LoopError::WriterGone) => None,
    };

    match reader_handle.join() {
        Ok(reader) => *reader_slot = Some(reader),
        Err(_) => set_if_none(&mut first_error, PipelineError::WorkerPanicked("reader")),
    }

    if detect_handle.join().is_err() {
        set_if_none(&mut first_error, PipelineError::WorkerPanicked("detect"));
    }

    match writer_handle.join() {
        Ok((mut writer, result)) => {
            match result {
                Ok(written) => {
                    if let Err(source) = writer.close() {
                        set_if_none(
                            &mut first_error,
                            PipelineError::Write {
                                frame: written,
                                source,
                            },
                        );
                    }
                }
                Err(e) => {
                    set_if_none(&mut first_error, e);
                    if let Err(close_err) = writer.close() {
                        log::warn!("Closing output after a write failure: {close_err}");
                    }
                }
            }
            *writer_slot = Some(writer);
        }
        Err(_) => set_if_none(&mut first_error, PipelineError::WorkerPanicked("writer")),
    }

    match (first_error, end) {
        (Some(e), _) => Err(e),
        (None, Some(end)) => Ok(end),
        (None, None) => Err(PipelineError::WorkerPanicked("writer")),
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
