use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::JobError;

/// Lifecycle of one engine invocation.
///
/// `Waiting -> Running -> {Finished, Error, Canceled}`, or
/// `Waiting -> Canceled` when the run stops before the job is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Waiting,
    Running,
    Finished,
    Error,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error | Self::Canceled)
    }

    /// Whether `self -> next` is an allowed transition.
    pub fn can_become(self, next: JobStatus) -> bool {
        match (self, next) {
            (Self::Waiting, Self::Running | Self::Canceled) => true,
            (Self::Running, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Waiting => write!(f, "Waiting"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Finished => write!(f, "Finished"),
            JobStatus::Error => write!(f, "Error"),
            JobStatus::Canceled => write!(f, "Canceled"),
        }
    }
}

/// Outcome of one job, returned once it reached a terminal status.
#[derive(Debug)]
pub struct JobResult {
    pub job_id: String,
    pub engine: Engine,
    pub spectrum_file: PathBuf,
    pub status: JobStatus,
    /// Set only when the job finished and its result file exists.
    pub output_file: Option<PathBuf>,
    pub exit_code: Option<i32>,
    pub error: Option<JobError>,
    /// Last lines the engine printed, oldest first.
    pub output_tail: Vec<String>,
    pub elapsed: Duration,
}

impl JobResult {
    pub fn finished(
        job_id: &str,
        engine: Engine,
        spectrum_file: &Path,
        output_file: PathBuf,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            engine,
            spectrum_file: spectrum_file.to_path_buf(),
            status: JobStatus::Finished,
            output_file: Some(output_file),
            exit_code,
            error: None,
            output_tail: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn failure(job_id: &str, engine: Engine, spectrum_file: &Path, error: JobError) -> Self {
        Self {
            job_id: job_id.to_string(),
            engine,
            spectrum_file: spectrum_file.to_path_buf(),
            status: JobStatus::Error,
            output_file: None,
            exit_code: None,
            error: Some(error),
            output_tail: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn canceled(job_id: &str, engine: Engine, spectrum_file: &Path) -> Self {
        Self {
            job_id: job_id.to_string(),
            engine,
            spectrum_file: spectrum_file.to_path_buf(),
            status: JobStatus::Canceled,
            output_file: None,
            exit_code: None,
            error: None,
            output_tail: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_tail(mut self, output_tail: Vec<String>) -> Self {
        self.output_tail = output_tail;
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Finished
    }

    pub fn spectrum_file_name(&self) -> String {
        self.spectrum_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
