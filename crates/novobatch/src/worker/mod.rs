pub mod job;
pub mod pool;
pub mod process;
pub mod scanner;
pub mod scheduler;

pub use job::{JobResult, JobStatus};
pub use pool::WorkerPool;
pub use process::ProcessJob;
pub use scanner::SpectrumScanner;
pub use scheduler::{FailurePolicy, JobErrorHandler, JobScheduler, LoggingErrorHandler};
