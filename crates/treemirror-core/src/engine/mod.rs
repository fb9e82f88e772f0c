/// Copy engine: executes one copy task under a supervised, stall-bounded worker.
///
/// Each task gets its own worker thread that streams bytes into the task's
/// temporary file and reports progress over a crossbeam channel. The calling
/// thread supervises:
///
/// - it waits for the next event for at most `progress_report_delay`;
/// - an event resets the silence clock, and `Done` / `Failed` end the task;
/// - a wait that ends without an event is only an idle tick, unless the
///   silence since the last event exceeds `stall_timeout`, which ends the
///   task as timed out and cancels the worker.
///
/// Keeping "no event this poll" separate from "no event for too long" lets
/// slow media finish while still bounding how long a hung device blocks the run.
///
/// # Filesystem effects
///
/// Only the supervisor touches `dst` and `dst_error`:
///
/// | Terminal | Effect |
/// |---|---|
/// | `Done` | rename `dst_tmp` onto `dst`, remove `dst_error` |
/// | `Failed` | write the failure message to `dst_error` |
/// | `TimedOut` | write `timeout` to `dst_error`, cancel the worker |
///
/// The temporary file is removed on every exit path, including a panic in
/// the supervising loop.
pub mod progress;
pub mod worker;

use crate::config::CopyConfig;
use crate::events::{EventSink, RunEvent};
use crate::model::outcome::TIMEOUT_MARKER;
use crate::model::{CopyTask, Outcome};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use progress::ProgressEvent;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use worker::{CopyJob, CopyWorker, StreamingWorker};

/// Result of one copy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyReport {
    pub outcome: Outcome,
    /// Bytes the worker reported as written before the task ended.
    pub bytes: u64,
    pub elapsed: Duration,
}

/// How the supervising loop ended, before any filesystem side effect.
enum Terminal {
    Done,
    Failed(String),
    TimedOut,
}

/// Runs copy tasks one at a time on the calling thread.
///
/// Several engines may run concurrently as long as their tasks' paths are
/// disjoint; an engine holds no state between tasks.
#[derive(Clone)]
pub struct CopyEngine {
    config: CopyConfig,
    worker: Arc<dyn CopyWorker>,
}

impl CopyEngine {
    pub fn new(config: CopyConfig) -> Self {
        Self::with_worker(config, Arc::new(StreamingWorker))
    }

    /// Use a custom worker, e.g. one that simulates a hung device.
    pub fn with_worker(config: CopyConfig, worker: Arc<dyn CopyWorker>) -> Self {
        Self { config, worker }
    }

    /// Copy one task to a terminal outcome.
    ///
    /// The parent directories of `dst`, `dst_tmp`, and `dst_error` must
    /// already exist. Never returns an error: every failure is recorded in
    /// the task's error marker and reflected in the outcome.
    pub fn execute(&self, task: &CopyTask, sink: &dyn EventSink) -> CopyReport {
        let started = Instant::now();
        let _tmp_guard = TempFileGuard(&task.dst_tmp);

        let (tx, rx) = crossbeam_channel::unbounded::<ProgressEvent>();
        let cancel = Arc::new(AtomicBool::new(false));
        let job = CopyJob {
            src: task.src.clone(),
            dst_tmp: task.dst_tmp.clone(),
            chunk_size: self.config.chunk_size,
        };
        let worker = Arc::clone(&self.worker);
        let cancel_clone = Arc::clone(&cancel);

        let spawned = thread::Builder::new()
            .name("treemirror-copy".into())
            .spawn(move || worker.copy(&job, &tx, &cancel_clone));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                let outcome = record_failure(task, format!("can't start copy worker: {e}"));
                return CopyReport {
                    outcome,
                    bytes: 0,
                    elapsed: started.elapsed(),
                };
            }
        };

        let (terminal, bytes) = self.supervise(task, &rx, started, sink);

        let outcome = match terminal {
            Terminal::Done => {
                // The worker sends `Done` as its last action.
                let _ = handle.join();
                match promote(&task.dst_tmp, &task.dst) {
                    Ok(()) => {
                        remove_if_exists(&task.dst_error);
                        Outcome::Copied
                    }
                    Err(e) => record_failure(task, format!("can't move into place: {e}")),
                }
            }
            Terminal::Failed(message) => {
                let _ = handle.join();
                record_failure(task, message)
            }
            Terminal::TimedOut => {
                write_marker(&task.dst_error, TIMEOUT_MARKER);
                cancel.store(true, Ordering::Relaxed);
                // The worker may be stuck in a blocking read; it is left to
                // unwind on its own and will not write again.
                drop(handle);
                Outcome::TimedOut
            }
        };

        CopyReport {
            outcome,
            bytes,
            elapsed: started.elapsed(),
        }
    }

    /// Poll the worker's events until a terminal state is reached.
    fn supervise(
        &self,
        task: &CopyTask,
        rx: &Receiver<ProgressEvent>,
        started: Instant,
        sink: &dyn EventSink,
    ) -> (Terminal, u64) {
        let report_delay = self.config.progress_report_delay;
        let stall_timeout = self.config.stall_timeout;
        let mut last_event = started;
        let mut bytes: u64 = 0;

        loop {
            // Never sleep past the stall deadline; the extra millisecond
            // puts the check strictly beyond it.
            let until_stall =
                stall_timeout.saturating_sub(last_event.elapsed()) + Duration::from_millis(1);
            let wait = report_delay.min(until_stall);

            match rx.recv_timeout(wait) {
                Ok(event) => {
                    let at = event.at().max(last_event);
                    let gap = at - last_event;
                    last_event = at;
                    match event {
                        ProgressEvent::InProgress { bytes: n, .. } => {
                            bytes += n as u64;
                            if gap > report_delay {
                                sink.emit(RunEvent::SlowProgress {
                                    src: task.src.clone(),
                                    gap,
                                });
                            }
                        }
                        ProgressEvent::Done { .. } => return (Terminal::Done, bytes),
                        ProgressEvent::Failed { message, .. } => {
                            return (Terminal::Failed(message), bytes)
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    let silent_for = last_event.elapsed();
                    if silent_for > stall_timeout {
                        debug!("{}: stalled for {silent_for:?}", task.src.display());
                        return (Terminal::TimedOut, bytes);
                    }
                    sink.emit(RunEvent::Idle {
                        src: task.src.clone(),
                        silent_for,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return (
                        Terminal::Failed("copy worker exited without reporting completion".into()),
                        bytes,
                    );
                }
            }
        }
    }
}

/// Removes the temporary file when the task ends, however it ends.
///
/// After a successful rename the file is already gone and this is a no-op.
struct TempFileGuard<'a>(&'a Path);

impl Drop for TempFileGuard<'_> {
    fn drop(&mut self) {
        remove_if_exists(self.0);
    }
}

/// Write `message` to the error marker and return the failed outcome.
fn record_failure(task: &CopyTask, message: String) -> Outcome {
    write_marker(&task.dst_error, &message);
    Outcome::CopyFailed { message }
}

/// Create or overwrite an error marker. A marker that cannot be written is
/// logged; the task outcome already records the failure for this run.
fn write_marker(path: &Path, content: &str) {
    if let Err(e) = fs::write(path, content) {
        warn!("failed to write error marker {}: {e}", path.display());
    }
}

pub(crate) fn remove_if_exists(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove {}: {e}", path.display()),
    }
}

/// Atomically replace `dst` with the finished temporary file.
///
/// A rename across filesystems is not possible; in that case the bytes are
/// copied to a staging sibling of `dst` and that sibling is renamed instead,
/// so `dst` still never holds a partial file.
fn promote(tmp: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(tmp, dst) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("{}: rename crosses devices, copying", dst.display());
            let staging = staging_path(dst);
            let result = fs::copy(tmp, &staging).and_then(|_| fs::rename(&staging, dst));
            if result.is_err() {
                remove_if_exists(&staging);
            }
            result
        }
        other => other,
    }
}

fn staging_path(dst: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(dst.file_name().unwrap_or_default());
    name.push(format!(".treemirror-{}.part", std::process::id()));
    dst.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChannelSink, NullSink};
    use crossbeam_channel::Sender;
    use std::io::Write;
    use tempfile::TempDir;

    fn task_in(tmp: &TempDir, content: &[u8]) -> CopyTask {
        let root = tmp.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("dst/.tmp")).unwrap();
        fs::write(root.join("src/f1.txt"), content).unwrap();
        CopyTask {
            src: root.join("src/f1.txt"),
            dst: root.join("dst/f1.txt"),
            dst_tmp: root.join("dst/.tmp/f1.txt"),
            dst_error: root.join("dst/f1.txt.error"),
        }
    }

    fn fast_config(stall_ms: u64) -> CopyConfig {
        CopyConfig {
            chunk_size: 1024,
            progress_report_delay: Duration::from_millis(20),
            stall_timeout: Duration::from_millis(stall_ms),
        }
    }

    /// Writes two chunks, then hangs like an unresponsive device until cancelled.
    struct HangingWorker;

    impl CopyWorker for HangingWorker {
        fn copy(&self, job: &CopyJob, events: &Sender<ProgressEvent>, cancel: &AtomicBool) {
            let mut out = fs::File::create(&job.dst_tmp).unwrap();
            for _ in 0..2 {
                out.write_all(&vec![1u8; job.chunk_size]).unwrap();
                let _ = events.send(ProgressEvent::in_progress(job.chunk_size));
            }
            while !cancel.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(5));
            }
        }
    }

    /// Copies correctly but pauses longer than the report delay between chunks.
    struct SlowWorker {
        pause: Duration,
    }

    impl CopyWorker for SlowWorker {
        fn copy(&self, job: &CopyJob, events: &Sender<ProgressEvent>, _cancel: &AtomicBool) {
            let data = fs::read(&job.src).unwrap();
            let _ = events.send(ProgressEvent::in_progress(0));
            thread::sleep(self.pause);
            fs::write(&job.dst_tmp, &data).unwrap();
            let _ = events.send(ProgressEvent::in_progress(data.len()));
            let _ = events.send(ProgressEvent::done());
        }
    }

    /// Exits without a terminal event.
    struct SilentExitWorker;

    impl CopyWorker for SilentExitWorker {
        fn copy(&self, job: &CopyJob, _events: &Sender<ProgressEvent>, _cancel: &AtomicBool) {
            fs::write(&job.dst_tmp, b"partial").unwrap();
        }
    }

    #[test]
    fn copies_and_clears_stale_marker() {
        let tmp = TempDir::new().unwrap();
        let data: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 256) as u8).collect();
        let task = task_in(&tmp, &data);
        fs::write(&task.dst_error, b"timeout").unwrap();

        let report = CopyEngine::new(CopyConfig::default()).execute(&task, &NullSink);

        assert_eq!(report.outcome, Outcome::Copied);
        assert_eq!(report.bytes, 5000);
        assert_eq!(fs::read(&task.dst).unwrap(), data);
        assert!(!task.dst_error.exists());
        assert!(!task.dst_tmp.exists());
    }

    #[test]
    fn replaces_existing_destination_atomically() {
        let tmp = TempDir::new().unwrap();
        let task = task_in(&tmp, b"new");
        fs::write(&task.dst, b"old contents").unwrap();

        let report = CopyEngine::new(CopyConfig::default()).execute(&task, &NullSink);
        assert_eq!(report.outcome, Outcome::Copied);
        assert_eq!(fs::read(&task.dst).unwrap(), b"new");
    }

    #[test]
    fn open_failure_writes_marker() {
        let tmp = TempDir::new().unwrap();
        let task = task_in(&tmp, b"x");
        fs::remove_file(&task.src).unwrap();

        let report = CopyEngine::new(CopyConfig::default()).execute(&task, &NullSink);

        match &report.outcome {
            Outcome::CopyFailed { message } => assert!(message.starts_with("can't open source")),
            other => panic!("expected CopyFailed, got {other:?}"),
        }
        let marker = fs::read_to_string(&task.dst_error).unwrap();
        assert!(marker.starts_with("can't open source"));
        assert!(!task.dst.exists());
        assert!(!task.dst_tmp.exists());
    }

    #[test]
    fn hung_worker_times_out() {
        let tmp = TempDir::new().unwrap();
        let task = task_in(&tmp, b"hello");
        let engine = CopyEngine::with_worker(fast_config(100), Arc::new(HangingWorker));

        let begin = Instant::now();
        let report = engine.execute(&task, &NullSink);
        let took = begin.elapsed();

        assert_eq!(report.outcome, Outcome::TimedOut);
        assert_eq!(report.bytes, 2048);
        assert!(took >= Duration::from_millis(100), "timed out early: {took:?}");
        assert!(took < Duration::from_secs(2), "timed out late: {took:?}");
        assert_eq!(fs::read_to_string(&task.dst_error).unwrap(), "timeout");
        assert!(!task.dst_tmp.exists());
        assert!(!task.dst.exists());
    }

    #[test]
    fn slow_progress_is_not_a_stall() {
        let tmp = TempDir::new().unwrap();
        let task = task_in(&tmp, b"slow but fine");
        let worker = SlowWorker {
            pause: Duration::from_millis(120),
        };
        let engine = CopyEngine::with_worker(fast_config(2_000), Arc::new(worker));
        let (tx, rx) = crossbeam_channel::unbounded();

        let report = engine.execute(&task, &ChannelSink::new(tx));

        assert_eq!(report.outcome, Outcome::Copied);
        assert_eq!(fs::read(&task.dst).unwrap(), b"slow but fine");
        let events: Vec<RunEvent> = rx.try_iter().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, RunEvent::SlowProgress { gap, .. } if *gap > Duration::from_millis(20))));
        assert!(events.iter().any(|e| matches!(e, RunEvent::Idle { .. })));
    }

    #[test]
    fn worker_exit_without_terminal_event_fails() {
        let tmp = TempDir::new().unwrap();
        let task = task_in(&tmp, b"x");
        let engine = CopyEngine::with_worker(fast_config(5_000), Arc::new(SilentExitWorker));

        let report = engine.execute(&task, &NullSink);

        assert!(matches!(report.outcome, Outcome::CopyFailed { .. }));
        assert!(task.dst_error.exists());
        assert!(!task.dst_tmp.exists(), "partial temporary file is removed");
        assert!(!task.dst.exists());
    }

    #[test]
    fn staging_path_is_hidden_sibling() {
        let staging = staging_path(Path::new("/dst/a/f.txt"));
        assert_eq!(staging.parent(), Some(Path::new("/dst/a")));
        let name = staging.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".f.txt.treemirror-"));
        assert!(name.ends_with(".part"));
    }
}
