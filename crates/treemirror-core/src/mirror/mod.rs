/// Mirror orchestration: one full run from traversal to per-task outcomes.
///
/// A run proceeds strictly in order:
///
/// 1. Walk the source root and materialize every entry.
/// 2. Plan one task per resolved file and validate the whole plan. A
///    collision aborts the run before anything is written.
/// 3. Write the traversal log under the destination root.
/// 4. For each task in turn: re-check its preconditions (fatal if broken),
///    skip it if the destination already exists, otherwise prepare its
///    directories and hand it to the copy engine.
///
/// Fatal conditions return `Err`. Per-task copy failures never do; they end
/// up in error markers and in the returned [`RunSummary`].
pub mod log;

use crate::config::RunConfig;
use crate::engine::worker::CopyWorker;
use crate::engine::CopyEngine;
use crate::error::MirrorError;
use crate::events::{EventSink, RunEvent};
use crate::model::{CopyTask, FsEntry, Outcome, RunSummary};
use crate::plan::{check_task, plan, validate_plan, SessionTmpRoot};
use crate::walker::{DirLister, FsLister, TreeWalker};
use chrono::Local;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub struct Mirror {
    config: RunConfig,
    engine: CopyEngine,
    lister: Arc<dyn DirLister>,
}

impl Mirror {
    pub fn new(config: RunConfig) -> Self {
        let engine = CopyEngine::new(config.copy);
        Self {
            config,
            engine,
            lister: Arc::new(FsLister),
        }
    }

    /// Replace the copy worker used for every task.
    pub fn with_worker(mut self, worker: Arc<dyn CopyWorker>) -> Self {
        self.engine = CopyEngine::with_worker(self.config.copy, worker);
        self
    }

    /// Replace how source directories are listed during traversal.
    pub fn with_lister(mut self, lister: Arc<dyn DirLister>) -> Self {
        self.lister = lister;
        self
    }

    /// Run the mirror once.
    pub fn run(&self, sink: &dyn EventSink) -> Result<RunSummary, MirrorError> {
        self.config.validate()?;
        let start = Instant::now();
        let mut summary = RunSummary::new(Local::now());
        let src_root = &self.config.src_root;
        let dst_root = &self.config.dst_root;
        info!("Mirroring {} -> {}", src_root.display(), dst_root.display());

        let entries: Vec<FsEntry> =
            TreeWalker::with_lister(src_root, Arc::clone(&self.lister)).collect();
        summary.entries = entries.len() as u64;
        summary.list_failures = entries.iter().filter(|e| e.is_list_failure()).count() as u64;
        sink.emit(RunEvent::TraversalComplete {
            entries: summary.entries,
            list_failures: summary.list_failures,
        });

        let tmp_root = SessionTmpRoot::new(dst_root);
        let tasks = plan(
            entries.iter().filter_map(FsEntry::as_resolved_file),
            src_root,
            dst_root,
            &tmp_root,
        );
        let log_path = self.config.log_path();
        validate_plan(&tasks, &log_path, tmp_root.path())?;

        log::write_traversal_log(&log_path, &entries)?;
        sink.emit(RunEvent::LogWritten { path: log_path });

        let copied = self.copy_all(&tasks, sink, &mut summary);
        remove_session_root(tmp_root.path());
        copied?;

        summary.duration = start.elapsed();
        sink.emit(RunEvent::RunComplete(summary.clone()));
        Ok(summary)
    }

    fn copy_all(
        &self,
        tasks: &[CopyTask],
        sink: &dyn EventSink,
        summary: &mut RunSummary,
    ) -> Result<(), MirrorError> {
        for task in tasks {
            check_task(task)?;

            // Existence alone counts as a completed earlier copy.
            if task.dst.is_file() {
                summary.record(&Outcome::Skipped, 0);
                sink.emit(RunEvent::TaskSkipped {
                    dst: task.dst.clone(),
                });
                continue;
            }

            sink.emit(RunEvent::TaskStarted {
                src: task.src.clone(),
                dst: task.dst.clone(),
                previously_failed: task.dst_error.is_file(),
            });
            prepare(task)?;

            let report = self.engine.execute(task, sink);
            summary.record(&report.outcome, report.bytes);
            sink.emit(RunEvent::TaskFinished {
                src: task.src.clone(),
                dst: task.dst.clone(),
                outcome: report.outcome,
                bytes: report.bytes,
                elapsed: report.elapsed,
            });
        }
        Ok(())
    }
}

/// Create the task's parent directories and clear a stale temporary file.
fn prepare(task: &CopyTask) -> Result<(), MirrorError> {
    for path in [&task.dst, &task.dst_error, &task.dst_tmp] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| MirrorError::Prepare {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    match fs::remove_file(&task.dst_tmp) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(MirrorError::Prepare {
            path: task.dst_tmp.clone(),
            source,
        }),
    }
}

/// Best-effort removal of the session's temporary subtree.
fn remove_session_root(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove temporary directory {}: {e}", path.display()),
    }
}
