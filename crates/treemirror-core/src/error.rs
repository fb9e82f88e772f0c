/// Errors that abort a whole run.
///
/// Per-task copy failures are deliberately absent: they are absorbed into
/// [`Outcome`](crate::model::Outcome) values and sidecar files and never
/// stop the next task.
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Which of a task's paths a check was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRole {
    Destination,
    Temporary,
    ErrorMarker,
}

impl fmt::Display for PathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PathRole::Destination => "destination",
            PathRole::Temporary => "temporary destination",
            PathRole::ErrorMarker => "error report destination",
        })
    }
}

/// Invalid run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("source root does not exist: {}", .0.display())]
    SourceRootMissing(PathBuf),
    #[error("source {} and destination {} overlap", .source_root.display(), .destination_root.display())]
    OverlappingRoots {
        source_root: PathBuf,
        destination_root: PathBuf,
    },
}

/// Fatal conditions that stop a run before or between copies.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error marker or reserved path coincides with a file scheduled for copy.
    #[error("path collision: {} is both a copy destination and {reason}", .path.display())]
    Collision { path: PathBuf, reason: &'static str },

    #[error("source does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("source is not a file: {}", .0.display())]
    SourceNotFile(PathBuf),

    #[error("{role} is not a file: {}", .path.display())]
    NotARegularFile { role: PathRole, path: PathBuf },

    #[error("failed to write traversal log {}: {source}", .path.display())]
    TraversalLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to prepare {}: {source}", .path.display())]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
