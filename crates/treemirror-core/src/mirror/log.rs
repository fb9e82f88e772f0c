/// Traversal log: one line per walker entry, in traversal order.
use crate::error::MirrorError;
use crate::model::FsEntry;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write (or overwrite) the traversal log at `path`.
pub fn write_traversal_log(path: &Path, entries: &[FsEntry]) -> Result<(), MirrorError> {
    write_lines(path, entries).map_err(|source| MirrorError::TraversalLog {
        path: path.to_path_buf(),
        source,
    })
}

fn write_lines(path: &Path, entries: &[FsEntry]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    for entry in entries {
        writeln!(out, "{entry}")?;
    }
    out.flush()
}
