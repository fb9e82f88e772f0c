/// Source tree traversal: a lazy, single-pass iterator over leaf entries.
///
/// The walker yields only leaves: anything that is not a directory, and
/// directories whose listing failed. A failed listing is not fatal; the
/// directory is reported once and traversal continues with its siblings. No
/// partial children are ever yielded for a directory that could not be
/// listed completely.
///
/// Nothing reachable is dropped. A path that cannot be stat'd, or that is
/// not a regular file, is still yielded as `ResolvedFile` so it shows up in
/// the traversal log and in the per-task checks that follow.
///
/// # Ordering
///
/// Children are visited in the order the filesystem returns them, which is
/// platform-dependent and never sorted. Consumers that need several passes
/// must collect the iterator first; it cannot be restarted.
///
/// # Symlinks
///
/// Symlinks are followed. The identities of the directories on the current
/// path are remembered, so a symlink back to an ancestor is detected and
/// skipped instead of being walked forever. Two aliases of the same
/// directory that do not form a cycle are both walked.
use crate::model::FsEntry;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::vec;
use tracing::{debug, warn};

#[cfg(unix)]
type DirKey = (u64, u64);
#[cfg(not(unix))]
type DirKey = PathBuf;

/// Lists the immediate children of a directory.
pub trait DirLister: Send + Sync {
    /// Return every child of `dir`, or fail as a whole.
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Lists directories with `read_dir`.
///
/// A child whose own metadata cannot be read (typically a directory with
/// read but no search permission) fails the whole listing, since that
/// child's kind, and whether it is a file to mirror, is unknown.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLister;

impl DirLister for FsLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut children = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            fs::symlink_metadata(&path)?;
            children.push(path);
        }
        Ok(children)
    }
}

/// A directory being walked: its identity and the children not yet visited.
struct Frame {
    key: Option<DirKey>,
    children: vec::IntoIter<PathBuf>,
}

/// Depth-first leaf iterator rooted at one path.
pub struct TreeWalker {
    root: Option<PathBuf>,
    /// Open directories, innermost last.
    stack: Vec<Frame>,
    lister: Arc<dyn DirLister>,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_lister(root, Arc::new(FsLister))
    }

    /// Walk with a custom directory lister.
    pub fn with_lister(root: impl Into<PathBuf>, lister: Arc<dyn DirLister>) -> Self {
        Self {
            root: Some(root.into()),
            stack: Vec::new(),
            lister,
        }
    }

    /// Visit one path. Returns the leaf it produced, if any; directories
    /// open a new frame instead.
    fn visit(&mut self, path: PathBuf) -> Option<FsEntry> {
        // `metadata` follows symlinks, so a link to a directory is walked.
        let meta = match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => meta,
            Ok(_) => {
                debug!("{}: file", path.display());
                return Some(FsEntry::ResolvedFile { path });
            }
            Err(err) => {
                warn!("{}: cannot stat ({err})", path.display());
                return Some(FsEntry::ResolvedFile { path });
            }
        };

        let key = dir_key(&path, &meta);
        if key.is_some() && self.stack.iter().any(|frame| frame.key == key) {
            warn!("{}: symlink cycle back to an ancestor, skipped", path.display());
            return None;
        }

        match self.lister.list(&path) {
            Ok(children) => {
                debug!("{}: directory, {} children", path.display(), children.len());
                self.stack.push(Frame {
                    key,
                    children: children.into_iter(),
                });
                None
            }
            Err(err) => {
                debug!("{}: directory, failed to list ({err})", path.display());
                Some(FsEntry::DirectoryListFailure { path })
            }
        }
    }
}

impl Iterator for TreeWalker {
    type Item = FsEntry;

    fn next(&mut self) -> Option<FsEntry> {
        if let Some(root) = self.root.take() {
            if let Some(entry) = self.visit(root) {
                return Some(entry);
            }
        }
        loop {
            let next_child = self.stack.last_mut()?.children.next();
            match next_child {
                Some(child) => {
                    if let Some(entry) = self.visit(child) {
                        return Some(entry);
                    }
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Walk `root`, yielding every reachable leaf exactly once.
pub fn walk(root: impl Into<PathBuf>) -> TreeWalker {
    TreeWalker::new(root)
}

#[cfg(unix)]
fn dir_key(_path: &Path, meta: &fs::Metadata) -> Option<DirKey> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn dir_key(path: &Path, _meta: &fs::Metadata) -> Option<DirKey> {
    fs::canonicalize(path).ok()
}
