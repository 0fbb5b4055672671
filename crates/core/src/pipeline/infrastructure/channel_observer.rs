use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::pipeline::batch_queue::{BatchQueue, BatchSummary, Job, JobStatus};
use crate::pipeline::batch_scheduler::BatchScheduler;
use crate::pipeline::pipeline_observer::PipelineObserver;
use crate::shared::constants::PREVIEW_CHANNEL_CAPACITY;
use crate::shared::frame::Frame;

/// Messages sent from a running batch to whoever drives it.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Progress(u8),
    Log(String),
    JobStarted {
        index: usize,
        total: usize,
        input: PathBuf,
    },
    JobFinished {
        index: usize,
        status: JobStatus,
        error: Option<String>,
    },
    Finished(BatchSummary),
}

/// A masked frame offered for display.
#[derive(Debug, Clone)]
pub struct FramePreview {
    pub index: usize,
    pub total: usize,
    pub frame: Frame,
}

/// Receiving ends of a [`ChannelObserver`].
///
/// `events` is lossless. `previews` holds at most
/// [`PREVIEW_CHANNEL_CAPACITY`] frames; newer previews are dropped while it is
/// full, so a receiver that never drains it costs bounded memory.
pub struct EventReceivers {
    pub events: Receiver<PipelineEvent>,
    pub previews: Receiver<FramePreview>,
}

/// Observer that turns every hook into a message on a channel.
///
/// Sends never block and a dropped receiver is ignored, so a caller that
/// stops listening cannot stall the pipeline.
pub struct ChannelObserver {
    tx: Sender<PipelineEvent>,
    preview_tx: Sender<FramePreview>,
    dropped_previews: usize,
}

impl ChannelObserver {
    pub fn new() -> (Self, EventReceivers) {
        let (tx, events) = crossbeam_channel::unbounded();
        let (preview_tx, previews) = crossbeam_channel::bounded(PREVIEW_CHANNEL_CAPACITY);
        let observer = Self {
            tx,
            preview_tx,
            dropped_previews: 0,
        };
        (observer, EventReceivers { events, previews })
    }

    /// Previews skipped because the preview channel was full.
    pub fn dropped_previews(&self) -> usize {
        self.dropped_previews
    }

    fn send(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}

impl PipelineObserver for ChannelObserver {
    fn on_progress(&mut self, percent: u8) {
        self.send(PipelineEvent::Progress(percent));
    }

    fn on_log(&mut self, message: &str) {
        self.send(PipelineEvent::Log(message.to_string()));
    }

    fn on_frame(&mut self, frame: &Frame, index: usize, total: usize) {
        // Skip the frame copy when the channel is already full.
        if self.preview_tx.is_full() {
            self.dropped_previews += 1;
            return;
        }
        let preview = FramePreview {
            index,
            total,
            frame: frame.clone(),
        };
        if let Err(TrySendError::Full(_)) = self.preview_tx.try_send(preview) {
            self.dropped_previews += 1;
        }
    }

    fn on_job_started(&mut self, index: usize, total: usize, job: &Job) {
        self.send(PipelineEvent::JobStarted {
            index,
            total,
            input: job.input_path().to_path_buf(),
        });
    }

    fn on_job_finished(&mut self, index: usize, job: &Job) {
        self.send(PipelineEvent::JobFinished {
            index,
            status: job.status(),
            error: job.error().map(str::to_string),
        });
    }

    fn on_finished(&mut self, summary: &BatchSummary) {
        self.send(PipelineEvent::Finished(*summary));
    }
}

/// Runs `queue` through `scheduler` on a background thread.
///
/// Returns the receivers and a handle yielding the queue, with final job
/// statuses, once the batch ends. Cancel through the flag the scheduler was
/// built with.
pub fn spawn_batch(
    scheduler: BatchScheduler,
    mut queue: BatchQueue,
) -> (EventReceivers, JoinHandle<BatchQueue>) {
    let (mut observer, receivers) = ChannelObserver::new();
    let handle = thread::spawn(move || {
        scheduler.run(&mut queue, &mut observer);
        queue
    });
    (receivers, handle)
}
