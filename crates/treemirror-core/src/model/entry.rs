/// A leaf produced by the tree walker.
///
/// Only two kinds of leaves exist: regular files that can be copied, and
/// directories whose listing failed. Successfully listed directories are
/// never yielded themselves; their children are.
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FsEntry {
    /// A regular file found during traversal.
    ResolvedFile { path: PathBuf },
    /// A directory whose children could not be enumerated.
    /// Traversal continued with its siblings.
    DirectoryListFailure { path: PathBuf },
}

impl FsEntry {
    /// Absolute path of the entry, rooted under the traversal root.
    pub fn path(&self) -> &Path {
        match self {
            FsEntry::ResolvedFile { path } | FsEntry::DirectoryListFailure { path } => path,
        }
    }

    /// Path of the file if this entry is a resolved file.
    pub fn as_resolved_file(&self) -> Option<&Path> {
        match self {
            FsEntry::ResolvedFile { path } => Some(path),
            FsEntry::DirectoryListFailure { .. } => None,
        }
    }

    pub fn is_list_failure(&self) -> bool {
        matches!(self, FsEntry::DirectoryListFailure { .. })
    }

    fn kind_name(&self) -> &'static str {
        match self {
            FsEntry::ResolvedFile { .. } => "ResolvedFile",
            FsEntry::DirectoryListFailure { .. } => "DirectoryListFailure",
        }
    }
}

/// Renders one traversal log line, e.g. `ResolvedFile(file=/src/a/b.txt)`.
impl fmt::Display for FsEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(file={})", self.kind_name(), self.path().display())
    }
}
