use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::detection::domain::detector_provider::DetectorProvider;
use crate::pipeline::batch_queue::{BatchQueue, BatchSummary, Job, JobStatus};
use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::image_worker_pool::{effective_workers, run_pool, PoolEvent};
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_observer::{NullObserver, PipelineObserver};
use crate::pipeline::stream_controller::{StreamController, StreamReport, StreamStatus};
use crate::video::domain::media_backend::MediaBackend;
use crate::video::infrastructure::file_media_backend::is_image;

/// Runs every pending job of a batch queue, isolating per-job failures.
///
/// A failed job is recorded and the batch moves on; only the cancellation
/// flag ends a batch early, in which case jobs that never started stay
/// `Pending`.
pub struct BatchScheduler {
    detectors: Arc<dyn DetectorProvider>,
    backend: Arc<dyn MediaBackend>,
    cancelled: Arc<AtomicBool>,
}

impl BatchScheduler {
    pub fn new(
        detectors: Arc<dyn DetectorProvider>,
        backend: Arc<dyn MediaBackend>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            detectors,
            backend,
            cancelled,
        }
    }

    /// Processes pending jobs strictly one after another, in queue order.
    pub fn run(&self, queue: &mut BatchQueue, observer: &mut dyn PipelineObserver) -> BatchSummary {
        self.run_pending(queue, observer);
        self.finish(queue, observer)
    }

    /// Processes pending image jobs on a bounded worker pool, then any
    /// remaining jobs (videos) sequentially.
    ///
    /// Per-frame events of parallel image jobs are not forwarded; job-level
    /// events are, in completion order.
    pub fn run_images_parallel(
        &self,
        queue: &mut BatchQueue,
        workers: usize,
        observer: &mut dyn PipelineObserver,
    ) -> BatchSummary {
        let total = queue.len();
        let items: Vec<(usize, Job)> = queue
            .jobs()
            .iter()
            .enumerate()
            .filter(|(_, job)| job.status() == JobStatus::Pending && is_image(job.input_path()))
            .map(|(index, job)| (index, job.clone()))
            .collect();

        if !items.is_empty() {
            let workers = effective_workers(workers);
            observer.on_log(&format!("Processing {} images on {workers} workers", items.len()));

            let mut running = BTreeSet::new();
            let panicked = run_pool(
                items,
                workers,
                &self.cancelled,
                |job: Job| self.run_job(&job, &mut NullObserver),
                |event| match event {
                    PoolEvent::Started(index) => {
                        let job = &mut queue.jobs_mut()[index];
                        job.start();
                        running.insert(index);
                        observer.on_job_started(index, total, job);
                    }
                    PoolEvent::Finished(index, result) => {
                        let job = &mut queue.jobs_mut()[index];
                        record_outcome(job, result);
                        running.remove(&index);
                        observer.on_job_finished(index, job);
                    }
                },
            );
            if panicked > 0 {
                log::warn!("{panicked} image worker(s) panicked");
            }
            for index in running {
                let job = &mut queue.jobs_mut()[index];
                job.fail(PipelineError::WorkerPanicked("image worker"));
                observer.on_job_finished(index, job);
            }
        }

        self.run_pending(queue, observer);
        self.finish(queue, observer)
    }

    fn run_pending(&self, queue: &mut BatchQueue, observer: &mut dyn PipelineObserver) {
        let total = queue.len();
        for index in 0..total {
            if self.cancelled.load(Ordering::Relaxed) {
                log::info!("Cancellation requested; remaining jobs left pending");
                break;
            }
            let job = &mut queue.jobs_mut()[index];
            if job.status() != JobStatus::Pending {
                continue;
            }

            job.start();
            observer.on_job_started(index, total, job);
            let result = self.run_job(job, observer);
            record_outcome(job, result);
            observer.on_job_finished(index, job);

            if job.status() == JobStatus::Stopped {
                break;
            }
        }
    }

    fn finish(&self, queue: &BatchQueue, observer: &mut dyn PipelineObserver) -> BatchSummary {
        let summary = queue.summary();
        observer.on_finished(&summary);
        summary
    }

    /// One job through its own stream controller. A detector that cannot be
    /// obtained fails the job before anything is opened.
    fn run_job(
        &self,
        job: &Job,
        observer: &mut dyn PipelineObserver,
    ) -> Result<StreamReport, PipelineError> {
        let detector = self
            .detectors
            .detector_for(job)
            .map_err(|source| PipelineError::DetectorUnavailable { source })?;
        let processor = FrameProcessor::new(detector, job.options().clone());
        let mut controller = StreamController::new(
            self.backend.reader_for(job.input_path()),
            self.backend.writer_for(job.output_path()),
            processor,
            self.cancelled.clone(),
        );
        controller.run(job.input_path(), job.output_path(), observer)
    }
}

fn record_outcome(job: &mut Job, result: Result<StreamReport, PipelineError>) {
    match result {
        Ok(report) if report.status == StreamStatus::Completed => {
            job.succeed(report.frames_written)
        }
        Ok(report) => {
            job.set_progress(partial_percent(&report));
            job.stop(report.frames_written);
        }
        Err(e) => {
            log::warn!("{} failed: {e}", job.input_path().display());
            job.fail(e);
        }
    }
}

fn partial_percent(report: &StreamReport) -> u8 {
    if report.total_frames == 0 {
        return 0;
    }
    (report.frames_written.min(report.total_frames) * 100 / report.total_frames).min(99) as u8
}
