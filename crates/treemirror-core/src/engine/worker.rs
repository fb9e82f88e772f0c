/// Copy workers: the blocking I/O half of a supervised copy.
///
/// A worker runs on its own thread and talks to its supervisor only through
/// the progress channel. It touches exactly two paths: it reads the source
/// and writes the temporary destination. Deciding what the destination looks
/// like afterwards (rename, error marker, cleanup) is the supervisor's job.
use crate::engine::progress::ProgressEvent;
use crossbeam_channel::Sender;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// What a worker is asked to do.
#[derive(Debug, Clone)]
pub struct CopyJob {
    pub src: PathBuf,
    pub dst_tmp: PathBuf,
    pub chunk_size: usize,
}

/// The I/O side of a copy.
///
/// Implementations must:
/// - emit exactly one terminal event (`Done` or `Failed`) unless cancelled,
///   and emit nothing after it;
/// - stop without writing further bytes once `cancel` is set;
/// - release every file handle on every exit path.
pub trait CopyWorker: Send + Sync {
    fn copy(&self, job: &CopyJob, events: &Sender<ProgressEvent>, cancel: &AtomicBool);
}

/// Streams the source into the temporary file in fixed-size chunks,
/// reporting one `InProgress` per chunk.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamingWorker;

impl CopyWorker for StreamingWorker {
    fn copy(&self, job: &CopyJob, events: &Sender<ProgressEvent>, cancel: &AtomicBool) {
        let mut input = match File::open(&job.src) {
            Ok(f) => f,
            Err(e) => {
                let _ = events.send(ProgressEvent::failed(format!("can't open source: {e}")));
                return;
            }
        };
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        let mut output = match File::create(&job.dst_tmp) {
            Ok(f) => f,
            Err(e) => {
                let _ = events.send(ProgressEvent::failed(format!(
                    "can't create temporary file: {e}"
                )));
                return;
            }
        };

        let mut buffer = vec![0u8; job.chunk_size];
        loop {
            let read = match input.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    let _ = events.send(ProgressEvent::failed(format!("read failed: {e}")));
                    return;
                }
            };
            // A read may have blocked past the stall timeout; nothing more
            // may be written once the supervisor has given up on this copy.
            if cancel.load(Ordering::Relaxed) {
                debug!("{}: cancelled", job.src.display());
                return;
            }
            if let Err(e) = output.write_all(&buffer[..read]) {
                let _ = events.send(ProgressEvent::failed(format!("write failed: {e}")));
                return;
            }
            let _ = events.send(ProgressEvent::in_progress(read));
        }

        if let Err(e) = output.sync_all() {
            let _ = events.send(ProgressEvent::failed(format!("sync failed: {e}")));
            return;
        }
        // Handles are closed before `Done` so the supervisor can rename immediately.
        drop(output);
        drop(input);
        let _ = events.send(ProgressEvent::done());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn run(job: &CopyJob) -> Vec<ProgressEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        StreamingWorker.copy(job, &tx, &AtomicBool::new(false));
        drop(tx);
        rx.iter().collect()
    }

    #[test]
    fn one_event_per_chunk_then_done() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src.bin");
        let data: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
        fs::write(&src, &data).unwrap();
        let job = CopyJob {
            src,
            dst_tmp: tmp.path().join("out.tmp"),
            chunk_size: 1024,
        };

        let events = run(&job);
        let chunks: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::InProgress { bytes, .. } => Some(*bytes),
                _ => None,
            })
            .collect();

        assert_eq!(chunks.iter().sum::<usize>(), 2500);
        assert!(chunks.len() >= 3, "2500 bytes need at least 3 KiB chunks");
        assert!(matches!(events.last(), Some(ProgressEvent::Done { .. })));
        assert_eq!(fs::read(&job.dst_tmp).unwrap(), data);
    }

    #[test]
    fn empty_source_is_done_without_progress() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("empty");
        fs::write(&src, b"").unwrap();
        let job = CopyJob {
            src,
            dst_tmp: tmp.path().join("empty.tmp"),
            chunk_size: 1024,
        };

        let events = run(&job);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ProgressEvent::Done { .. }));
        assert!(job.dst_tmp.exists());
    }

    #[test]
    fn missing_source_fails_immediately() {
        let tmp = TempDir::new().unwrap();
        let job = CopyJob {
            src: tmp.path().join("absent"),
            dst_tmp: tmp.path().join("absent.tmp"),
            chunk_size: 1024,
        };

        let events = run(&job);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ProgressEvent::Failed { message, .. } => assert!(message.starts_with("can't open source")),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(!job.dst_tmp.exists(), "temporary file is never created");
    }

    #[test]
    fn unwritable_tmp_fails() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::write(&src, b"abc").unwrap();
        let job = CopyJob {
            src,
            dst_tmp: tmp.path().join("no_such_dir").join("out.tmp"),
            chunk_size: 1024,
        };

        let events = run(&job);
        assert!(matches!(
            events.as_slice(),
            [ProgressEvent::Failed { message, .. }] if message.starts_with("can't create temporary file")
        ));
    }

    #[test]
    fn cancelled_worker_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::write(&src, vec![7u8; 4096]).unwrap();
        let job = CopyJob {
            src,
            dst_tmp: tmp.path().join("out.tmp"),
            chunk_size: 1024,
        };

        let (tx, rx) = crossbeam_channel::unbounded();
        StreamingWorker.copy(&job, &tx, &AtomicBool::new(true));
        drop(tx);
        assert_eq!(rx.iter().count(), 0);
        assert!(!job.dst_tmp.exists());
    }
}
