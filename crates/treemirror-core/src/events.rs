/// Structured run events: what happened during a mirror run, reported to an
/// injected sink instead of printed.
///
/// Nothing in the engine depends on how events are rendered. The CLI renders
/// them through `tracing`; tests and other frontends can collect them from a
/// crossbeam channel, the same way a UI drains scanner progress.
use crate::model::{Outcome, RunSummary};
use crossbeam_channel::Sender;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Traversal finished and the entry list was materialized.
    TraversalComplete { entries: u64, list_failures: u64 },
    /// The traversal log was written.
    LogWritten { path: PathBuf },
    /// The destination already exists; no copy was attempted.
    TaskSkipped { dst: PathBuf },
    /// A copy attempt is about to start.
    TaskStarted {
        src: PathBuf,
        dst: PathBuf,
        /// An error marker from an earlier run exists for this file.
        previously_failed: bool,
    },
    /// Progress resumed after a gap longer than the report delay.
    SlowProgress { src: PathBuf, gap: Duration },
    /// A poll window passed with no event, still under the stall timeout.
    Idle { src: PathBuf, silent_for: Duration },
    /// A copy attempt reached a terminal state.
    TaskFinished {
        src: PathBuf,
        dst: PathBuf,
        outcome: Outcome,
        bytes: u64,
        elapsed: Duration,
    },
    /// Every task was processed.
    RunComplete(RunSummary),
}

/// Receiver of run events. Must not block for long; it is called from the
/// supervising loop between polls.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RunEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: RunEvent) {}
}

/// Renders events as `tracing` log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: RunEvent) {
        match event {
            RunEvent::TraversalComplete {
                entries,
                list_failures,
            } => info!("Traversal complete: {entries} entries, {list_failures} unlistable directories"),
            RunEvent::LogWritten { path } => debug!("Traversal log written to {}", path.display()),
            RunEvent::TaskSkipped { dst } => info!("{} - exists, skipped", dst.display()),
            RunEvent::TaskStarted {
                dst,
                previously_failed,
                ..
            } => {
                let prev = if previously_failed { " (was failed)" } else { "" };
                info!("{} - try copy{prev}", dst.display());
            }
            RunEvent::SlowProgress { src, gap } => {
                info!("{} - progress resumed after {gap:.1?}", src.display())
            }
            RunEvent::Idle { src, silent_for } => {
                debug!("{} - no progress for {silent_for:.1?}", src.display())
            }
            RunEvent::TaskFinished {
                src,
                outcome,
                bytes,
                elapsed,
                ..
            } => match outcome {
                Outcome::Copied => info!("{} - success ({bytes} bytes in {elapsed:.1?})", src.display()),
                Outcome::Skipped => info!("{} - skipped", src.display()),
                Outcome::CopyFailed { message } => warn!("{} - fail: {message}", src.display()),
                Outcome::TimedOut => warn!("{} - too long reading, timed out", src.display()),
            },
            RunEvent::RunComplete(summary) => info!("Run complete: {summary}"),
        }
    }
}

/// Forwards events into a crossbeam channel.
///
/// A disconnected receiver is not an error: the run continues and events
/// are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<RunEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<RunEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: RunEvent) {
        let _ = self.tx.send(event);
    }
}
