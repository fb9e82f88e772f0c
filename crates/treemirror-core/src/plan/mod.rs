/// Copy planning: turns resolved source files into copy tasks.
///
/// Planning is pure path arithmetic and cannot fail: every input is an
/// already-resolved path under the source root.
///
/// For a file at `relative` below the source root:
///
/// ```text
/// dst       = dst_root / relative
/// dst_tmp   = session_tmp_root / relative
/// dst_error = parent(dst) / (file_name(dst) + ".error")
/// ```
pub mod validate;

use crate::model::task::ERROR_SUFFIX;
use crate::model::CopyTask;
use chrono::Local;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub use validate::{check_task, validate_plan};

/// Distinguishes sessions started within the same millisecond in one process.
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A temporary subtree under the destination root, unique to one run.
///
/// In-flight copies are written here and renamed into place on success, so
/// two runs (or a run and the leftovers of a crashed one) never share a
/// temporary file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTmpRoot(PathBuf);

impl SessionTmpRoot {
    /// Derive a fresh session root from the wall clock, the process id, and
    /// a per-process counter.
    pub fn new(dst_root: &Path) -> Self {
        let millis = Local::now().timestamp_millis();
        let seq = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
        let name = format!(".treemirror_{millis}_{}_{seq}_tmp", std::process::id());
        Self(dst_root.join(name))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Plan one task per resolved file, preserving input order.
pub fn plan<'a>(
    files: impl IntoIterator<Item = &'a Path>,
    src_root: &Path,
    dst_root: &Path,
    tmp_root: &SessionTmpRoot,
) -> Vec<CopyTask> {
    files
        .into_iter()
        .map(|src| plan_task(src, src_root, dst_root, tmp_root))
        .collect()
}

/// Plan the task for a single source file.
pub fn plan_task(src: &Path, src_root: &Path, dst_root: &Path, tmp_root: &SessionTmpRoot) -> CopyTask {
    let relative = relative_path(src, src_root);
    let dst = dst_root.join(&relative);
    let dst_tmp = tmp_root.path().join(&relative);
    let dst_error = error_marker_path(&dst);
    CopyTask {
        src: src.to_path_buf(),
        dst,
        dst_tmp,
        dst_error,
    }
}

/// Path of `src` relative to `src_root`.
///
/// When the source root is itself a file the relative path would be empty;
/// the file name is used instead so the file lands inside the destination root.
fn relative_path(src: &Path, src_root: &Path) -> PathBuf {
    match src.strip_prefix(src_root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => src.file_name().map(PathBuf::from).unwrap_or_default(),
    }
}

/// Sibling of `dst` with [`ERROR_SUFFIX`] appended to the file name.
pub fn error_marker_path(dst: &Path) -> PathBuf {
    let mut name = dst.file_name().map(OsString::from).unwrap_or_default();
    name.push(ERROR_SUFFIX);
    dst.with_file_name(name)
}
