use std::collections::HashMap;
use std::time::Instant;

use crate::pipeline::batch_queue::{BatchSummary, Job};
use crate::shared::frame::Frame;

/// Caller-facing event surface of a stream or batch run.
///
/// All hooks are advisory: the pipeline never waits on or depends on what an
/// observer does with them.
pub trait PipelineObserver: Send {
    /// Percent complete of the current stream, 0..=100.
    fn on_progress(&mut self, percent: u8);

    /// Human-readable status line.
    fn on_log(&mut self, message: &str);

    /// Preview of a processed frame. Default: ignored.
    fn on_frame(&mut self, _frame: &Frame, _index: usize, _total: usize) {}

    /// How long a named stage took for one frame. Default: ignored.
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}

    fn on_job_started(&mut self, _index: usize, _total: usize, _job: &Job) {}

    fn on_job_finished(&mut self, _index: usize, _job: &Job) {}

    /// Called once when a batch run ends, however it ends.
    fn on_finished(&mut self, _summary: &BatchSummary) {}
}

/// Discards every event.
pub struct NullObserver;

impl PipelineObserver for NullObserver {
    fn on_progress(&mut self, _percent: u8) {}
    fn on_log(&mut self, _message: &str) {}
}

/// Forwards events to the `log` facade and keeps per-stage timings for an
/// end-of-batch summary.
pub struct LogObserver {
    timings: HashMap<String, Vec<f64>>,
    start_time: Instant,
}

impl LogObserver {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Average time per stage plus overall throughput, or `None` before any
    /// frame was timed.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() {
            return None;
        }
        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let frames = self.timings.get("mask").map_or(0, Vec::len);
        let mut lines = vec![format!(
            "Pipeline summary ({frames} frames, {elapsed_s:.1}s total):"
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!("  {stage:8}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"));
        }

        if frames > 0 && elapsed_s > 0.0 {
            lines.push(format!("  Throughput: {:.1} fps", frames as f64 / elapsed_s));
        }
        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(Vec::as_slice)
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineObserver for LogObserver {
    fn on_progress(&mut self, percent: u8) {
        log::info!("Progress: {percent}%");
    }

    fn on_log(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn on_job_started(&mut self, index: usize, total: usize, job: &Job) {
        log::info!(
            "[{}/{total}] {} -> {}",
            index + 1,
            job.input_path().display(),
            job.output_path().display()
        );
    }

    fn on_job_finished(&mut self, index: usize, job: &Job) {
        match job.error() {
            Some(err) => log::warn!("[{}] {} failed: {err}", index + 1, job.input_path().display()),
            None => log::info!("[{}] {} {}", index + 1, job.input_path().display(), job.status()),
        }
    }

    fn on_finished(&mut self, summary: &BatchSummary) {
        log::info!("Batch finished: {summary}");
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
