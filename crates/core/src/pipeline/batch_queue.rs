use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::shared::options::AnonymizationOptions;

/// Lifecycle of a single batch job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Stopped,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::Stopped)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// One input-to-output anonymization task.
///
/// Status only moves forward (`Pending -> Running -> terminal`); transitions
/// are driven by the scheduler.
#[derive(Clone, Debug)]
pub struct Job {
    input_path: PathBuf,
    output_path: PathBuf,
    options: Arc<AnonymizationOptions>,
    status: JobStatus,
    progress_percent: u8,
    error: Option<String>,
    frames_written: usize,
}

impl Job {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        options: Arc<AnonymizationOptions>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            options,
            status: JobStatus::Pending,
            progress_percent: 0,
            error: None,
            frames_written: 0,
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn options(&self) -> &Arc<AnonymizationOptions> {
        &self.options
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    /// Failure message recorded when the job ended `Failed`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn start(&mut self) {
        self.status = JobStatus::Running;
        self.progress_percent = 0;
        self.error = None;
    }

    pub(crate) fn set_progress(&mut self, percent: u8) {
        self.progress_percent = percent.min(100);
    }

    pub(crate) fn succeed(&mut self, frames_written: usize) {
        self.status = JobStatus::Succeeded;
        self.progress_percent = 100;
        self.frames_written = frames_written;
    }

    pub(crate) fn stop(&mut self, frames_written: usize) {
        self.status = JobStatus::Stopped;
        self.frames_written = frames_written;
    }

    pub(crate) fn fail(&mut self, error: impl fmt::Display) {
        self.status = JobStatus::Failed;
        self.error = Some(error.to_string());
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum BatchError {
    #[error("{} is already queued", .0.display())]
    DuplicateInput(PathBuf),
    #[error("job index {index} out of range (queue holds {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Overall result of a batch run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed,
    CompletedWithFailures,
    Stopped,
}

/// Per-status job counts after (or during) a batch run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub stopped: usize,
    /// Jobs that never reached a terminal status.
    pub remaining: usize,
    pub outcome: BatchOutcome,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} stopped, {} not started",
            self.succeeded, self.failed, self.stopped, self.remaining
        )
    }
}

/// Ordered list of jobs. Insertion order is processing order.
#[derive(Debug, Default)]
pub struct BatchQueue {
    jobs: Vec<Job>,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `job`, rejecting an input path that is already queued.
    ///
    /// Paths are compared after resolving them against the working directory
    /// and dropping `.` and `..` components, so `./a.mp4` and `a.mp4` clash.
    pub fn push(&mut self, job: Job) -> Result<usize, BatchError> {
        let key = normalize_path(&job.input_path);
        if self.jobs.iter().any(|j| normalize_path(&j.input_path) == key) {
            return Err(BatchError::DuplicateInput(job.input_path));
        }
        self.jobs.push(job);
        Ok(self.jobs.len() - 1)
    }

    pub fn remove(&mut self, index: usize) -> Result<Job, BatchError> {
        self.check_index(index)?;
        Ok(self.jobs.remove(index))
    }

    /// Swaps the job with its predecessor; a no-op for the first job.
    pub fn move_up(&mut self, index: usize) -> Result<(), BatchError> {
        self.check_index(index)?;
        if index > 0 {
            self.jobs.swap(index - 1, index);
        }
        Ok(())
    }

    /// Swaps the job with its successor; a no-op for the last job.
    pub fn move_down(&mut self, index: usize) -> Result<(), BatchError> {
        self.check_index(index)?;
        if index + 1 < self.jobs.len() {
            self.jobs.swap(index, index + 1);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub(crate) fn jobs_mut(&mut self) -> &mut [Job] {
        &mut self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn summary(&self) -> BatchSummary {
        let count = |status: JobStatus| self.jobs.iter().filter(|j| j.status == status).count();
        let succeeded = count(JobStatus::Succeeded);
        let failed = count(JobStatus::Failed);
        let stopped = count(JobStatus::Stopped);
        let remaining = self.jobs.len() - succeeded - failed - stopped;
        let outcome = if stopped > 0 || remaining > 0 {
            BatchOutcome::Stopped
        } else if failed > 0 {
            BatchOutcome::CompletedWithFailures
        } else {
            BatchOutcome::Completed
        };
        BatchSummary {
            succeeded,
            failed,
            stopped,
            remaining,
            outcome,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), BatchError> {
        if index < self.jobs.len() {
            Ok(())
        } else {
            Err(BatchError::IndexOutOfRange {
                index,
                len: self.jobs.len(),
            })
        }
    }
}

/// Lexical form of `path` used for duplicate checks. The file need not exist.
fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_relative() {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    } else {
        path.to_path_buf()
    };
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
