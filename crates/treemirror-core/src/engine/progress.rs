/// Copy progress reporting: lightweight messages sent from a copy worker
/// to its supervisor via a crossbeam channel.
///
/// Each event is timestamped when the worker emits it, not when the
/// supervisor receives it, so the supervisor measures gaps between real
/// progress rather than between its own polls.
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// One chunk was read and written to the temporary file.
    InProgress { at: Instant, bytes: usize },
    /// Source exhausted; every byte is written and synced.
    Done { at: Instant },
    /// Opening, reading, or writing failed. The worker has exited.
    Failed { at: Instant, message: String },
}

impl ProgressEvent {
    pub fn in_progress(bytes: usize) -> Self {
        ProgressEvent::InProgress {
            at: Instant::now(),
            bytes,
        }
    }

    pub fn done() -> Self {
        ProgressEvent::Done { at: Instant::now() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ProgressEvent::Failed {
            at: Instant::now(),
            message: message.into(),
        }
    }

    /// When the worker emitted this event.
    pub fn at(&self) -> Instant {
        match self {
            ProgressEvent::InProgress { at, .. }
            | ProgressEvent::Done { at }
            | ProgressEvent::Failed { at, .. } => *at,
        }
    }
}
