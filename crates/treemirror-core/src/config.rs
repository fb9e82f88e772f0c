/// Run configuration supplied by the frontend.
///
/// The core never parses arguments itself; the CLI (or a test) builds a
/// [`RunConfig`] and the mirror validates it before touching the filesystem.
use crate::error::ConfigError;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Bytes read and written per worker iteration.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Bounded wait for the next progress event, and the gap that counts as slow.
pub const DEFAULT_PROGRESS_REPORT_DELAY: Duration = Duration::from_millis(5_000);

/// Silence after which a running copy is declared stalled.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Traversal log name, relative to the destination root.
pub const DEFAULT_LOG_FILE_NAME: &str = "src_file.txt";

/// Tunables for a single supervised copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyConfig {
    pub chunk_size: usize,
    pub progress_report_delay: Duration,
    pub stall_timeout: Duration,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_report_delay: DEFAULT_PROGRESS_REPORT_DELAY,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }
}

impl CopyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.progress_report_delay.is_zero() {
            return Err(ConfigError::ZeroDuration("progress report delay"));
        }
        if self.stall_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("stall timeout"));
        }
        Ok(())
    }
}

/// Everything one mirror run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Absolute path of the tree to mirror.
    pub src_root: PathBuf,
    /// Absolute path the tree is mirrored onto.
    pub dst_root: PathBuf,
    pub copy: CopyConfig,
    pub log_file_name: String,
}

impl RunConfig {
    pub fn new(src_root: impl Into<PathBuf>, dst_root: impl Into<PathBuf>) -> Self {
        Self {
            src_root: src_root.into(),
            dst_root: dst_root.into(),
            copy: CopyConfig::default(),
            log_file_name: DEFAULT_LOG_FILE_NAME.to_string(),
        }
    }

    pub fn with_copy_config(mut self, copy: CopyConfig) -> Self {
        self.copy = copy;
        self
    }

    pub fn with_log_file_name(mut self, name: impl Into<String>) -> Self {
        self.log_file_name = name.into();
        self
    }

    /// Where the traversal log is written.
    pub fn log_path(&self) -> PathBuf {
        self.dst_root.join(&self.log_file_name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.copy.validate()?;
        if !self.src_root.exists() {
            return Err(ConfigError::SourceRootMissing(self.src_root.clone()));
        }
        if roots_overlap(&self.src_root, &self.dst_root) {
            return Err(ConfigError::OverlappingRoots {
                source_root: self.src_root.clone(),
                destination_root: self.dst_root.clone(),
            });
        }
        Ok(())
    }
}

/// `true` if either root lies inside (or equals) the other.
fn roots_overlap(a: &Path, b: &Path) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    a.starts_with(&b) || b.starts_with(&a)
}

/// Lexically drop `.` and resolve `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
