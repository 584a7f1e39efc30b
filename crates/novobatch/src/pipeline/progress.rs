use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::engine::Engine;
use crate::worker::JobStatus;

/// Phase of a batch run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Discovering,
    Sequencing,
    Parsing,
    Exporting,
    Completed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Discovering => write!(f, "Discovering spectrum files"),
            RunPhase::Sequencing => write!(f, "Sequencing"),
            RunPhase::Parsing => write!(f, "Parsing results"),
            RunPhase::Exporting => write!(f, "Exporting"),
            RunPhase::Completed => write!(f, "Completed"),
        }
    }
}

/// Events emitted while a batch runs. Advisory only: nothing depends on
/// them being delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Phase {
        phase: RunPhase,
        message: String,
    },
    Job {
        job_id: String,
        engine: Engine,
        spectrum_file: String,
        status: JobStatus,
        elapsed_ms: u64,
    },
    /// Position within a long scan. `total` is fixed for a given scan.
    Tick {
        file: String,
        done: u64,
        total: u64,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for tests and headless runs.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Progress event as sent over the broadcast channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunProgressEvent {
    pub run_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<RunPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<Engine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
    pub timestamp: DateTime<Utc>,
}

/// Bridges progress events to a `tokio::sync::broadcast` channel so any
/// number of listeners can follow a run.
pub struct BroadcastProgress {
    run_id: String,
    sender: Arc<broadcast::Sender<RunProgressEvent>>,
}

impl BroadcastProgress {
    pub fn new(run_id: &str, sender: Arc<broadcast::Sender<RunProgressEvent>>) -> Self {
        Self {
            run_id: run_id.to_string(),
            sender,
        }
    }

    fn event(&self, message: String) -> RunProgressEvent {
        RunProgressEvent {
            run_id: self.run_id.clone(),
            message,
            phase: None,
            job_id: None,
            engine: None,
            status: None,
            percent: None,
            timestamp: Utc::now(),
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        let event = match event {
            ProgressEvent::Phase { phase, message } => RunProgressEvent {
                phase: Some(phase),
                ..self.event(message)
            },
            ProgressEvent::Job {
                job_id,
                engine,
                spectrum_file,
                status,
                elapsed_ms,
            } => RunProgressEvent {
                job_id: Some(job_id),
                engine: Some(engine),
                status: Some(status),
                ..self.event(format!(
                    "{} on {}: {} ({} ms)",
                    engine, spectrum_file, status, elapsed_ms
                ))
            },
            ProgressEvent::Tick { file, done, total } => {
                let percent = if total == 0 {
                    100
                } else {
                    (done.min(total) * 100 / total) as u8
                };
                RunProgressEvent {
                    percent: Some(percent),
                    ..self.event(format!("{}: {}%", file, percent))
                }
            }
        };
        // No receivers is not an error
        let _ = self.sender.send(event);
    }
}
