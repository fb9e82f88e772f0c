/// Plan validation: structural checks that must hold before any data moves.
///
/// Two levels of checking:
///
/// - [`validate_plan`] runs once over the whole plan before any I/O. An
///   error marker that coincides with another task's destination would make
///   a failure record indistinguishable from copied content, so the run is
///   refused outright.
/// - [`check_task`] runs immediately before each task's copy attempt, because
///   the filesystem can change between traversal and copy.
use crate::error::{MirrorError, PathRole};
use crate::model::CopyTask;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Check that no task's write targets collide with another's or with the
/// run's reserved paths.
///
/// `log_path` is the traversal log; `tmp_root` is the session temporary
/// root, which must never contain a final destination.
pub fn validate_plan(tasks: &[CopyTask], log_path: &Path, tmp_root: &Path) -> Result<(), MirrorError> {
    let destinations: HashSet<&Path> = tasks.iter().map(|t| t.dst.as_path()).collect();

    for task in tasks {
        if destinations.contains(task.dst_error.as_path()) {
            return Err(MirrorError::Collision {
                path: task.dst_error.clone(),
                reason: "an error marker",
            });
        }
    }

    for task in tasks {
        if task.dst == log_path || task.dst_error == log_path {
            return Err(MirrorError::Collision {
                path: log_path.to_path_buf(),
                reason: "the traversal log; choose another log file name",
            });
        }
        if task.dst.starts_with(tmp_root) {
            return Err(MirrorError::Collision {
                path: task.dst.clone(),
                reason: "inside the session temporary root",
            });
        }
    }

    Ok(())
}

/// Per-task preconditions, checked right before the copy attempt.
///
/// The source must still be a regular file, and any existing destination,
/// temporary, or error-marker path must be a regular file too. A directory
/// in any of those places is a conflict the engine cannot resolve safely.
pub fn check_task(task: &CopyTask) -> Result<(), MirrorError> {
    match fs::metadata(&task.src) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(MirrorError::SourceNotFile(task.src.clone())),
        Err(_) => return Err(MirrorError::SourceMissing(task.src.clone())),
    }

    for (role, path) in [
        (PathRole::Destination, &task.dst),
        (PathRole::Temporary, &task.dst_tmp),
        (PathRole::ErrorMarker, &task.dst_error),
    ] {
        if let Ok(meta) = fs::metadata(path) {
            if !meta.is_file() {
                return Err(MirrorError::NotARegularFile {
                    role,
                    path: path.clone(),
                });
            }
        }
    }

    Ok(())
}
