use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::config::RunConfig;
use crate::engine;
use crate::error::{ConfigError, WorkerError};
use crate::identification::ModificationCatalog;
use crate::pipeline::ProgressReporter;
use crate::worker::job::{JobResult, JobStatus};
use crate::worker::pool::WorkerPool;
use crate::worker::process::ProcessJob;

/// What the run does when one job ends in error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep running the other jobs.
    #[default]
    Continue,
    /// Raise the run-level cancellation.
    CancelRun,
}

/// Receives jobs that ended in error.
pub trait JobErrorHandler: Send + Sync {
    fn on_job_error(&self, result: &JobResult);
}

/// Logs job failures together with the tail of the engine output.
pub struct LoggingErrorHandler;

impl JobErrorHandler for LoggingErrorHandler {
    fn on_job_error(&self, result: &JobResult) {
        let reason = result
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        error!(
            "{} failed on {}: {}",
            result.engine,
            result.spectrum_file.display(),
            reason
        );
        for line in &result.output_tail {
            error!("  {}", line);
        }
    }
}

/// Runs every (engine, spectrum file) pair on a bounded number of threads.
pub struct JobScheduler {
    threads: usize,
    policy: FailurePolicy,
}

impl JobScheduler {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// One job per enabled engine and spectrum file, engine-major.
    pub fn plan(
        config: &RunConfig,
        catalog: &ModificationCatalog,
        spectrum_files: &[PathBuf],
    ) -> Result<Vec<Arc<ProcessJob>>, ConfigError> {
        let mut jobs = Vec::new();
        for engine in config.engines() {
            for spectrum_file in spectrum_files {
                let command = engine::build_command(engine, config, catalog, spectrum_file)?;
                jobs.push(Arc::new(ProcessJob::new(spectrum_file.clone(), command)));
            }
        }
        Ok(jobs)
    }

    /// Blocks until every job is terminal and returns their results in
    /// submission order.
    pub fn run(
        &self,
        jobs: &[Arc<ProcessJob>],
        cancel: &CancellationToken,
        progress: Arc<dyn ProgressReporter>,
        error_handler: &dyn JobErrorHandler,
    ) -> Result<Vec<JobResult>, WorkerError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let worker_count = self.threads.min(jobs.len());
        let pool = WorkerPool::new(worker_count, cancel.clone(), progress)?;
        info!("Running {} jobs on {} threads", jobs.len(), worker_count);

        let mut results = Vec::with_capacity(jobs.len());
        let mut pending = jobs.iter();
        let mut in_flight = 0usize;

        let outcome = loop {
            // Never queue more than the pool can run, so that cancellation
            // catches every job not yet started.
            let mut submit_error = None;
            while in_flight < worker_count {
                let Some(job) = pending.next() else { break };
                if cancel.is_cancelled() {
                    results.push(job.skip());
                    continue;
                }
                if let Err(e) = pool.submit(Arc::clone(job)) {
                    submit_error = Some(e);
                    break;
                }
                in_flight += 1;
            }
            if let Some(e) = submit_error {
                break Err(e);
            }

            if in_flight == 0 {
                break Ok(());
            }

            let Some(result) = pool.recv_result() else {
                break Err(WorkerError::ChannelClosed);
            };
            in_flight -= 1;

            if result.status == JobStatus::Error {
                error_handler.on_job_error(&result);
                if self.policy == FailurePolicy::CancelRun && !cancel.is_cancelled() {
                    warn!("Cancelling run after {} failure", result.engine);
                    cancel.cancel();
                }
            }
            results.push(result);
        };

        pool.shutdown();
        pool.wait();
        outcome?;

        let order: HashMap<&str, usize> = jobs
            .iter()
            .enumerate()
            .map(|(i, job)| (job.id(), i))
            .collect();
        results.sort_by_key(|r| order.get(r.job_id.as_str()).copied().unwrap_or(usize::MAX));

        let finished = results.iter().filter(|r| r.is_success()).count();
        info!("{} of {} jobs finished", finished, results.len());
        Ok(results)
    }
}
