pub mod progress;

pub use progress::{
    BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter, RunPhase, RunProgressEvent,
};
