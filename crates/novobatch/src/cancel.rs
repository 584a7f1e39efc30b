use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;

use crate::error::WorkerError;

/// Run-wide stop signal shared by the scheduler, running jobs and parsers.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Raises this token on Ctrl-C. Only one handler can be installed per
    /// process.
    pub fn cancel_on_ctrlc(&self) -> Result<(), WorkerError> {
        let token = self.clone();
        ctrlc::set_handler(move || {
            info!("Received Ctrl-C, cancelling run...");
            token.cancel();
        })
        .map_err(|e| WorkerError::SignalHandler(e.to_string()))
    }
}
