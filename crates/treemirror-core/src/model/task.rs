/// The four-path bundle describing one file's copy.
///
/// Every path is derived deterministically from the file's path relative to
/// the source root, so the same source file always maps to the same
/// destination and error marker across runs. Only the temporary path varies
/// per run because it lives under the session's temporary root.
use std::path::PathBuf;

/// Suffix appended to the destination file name to form its error marker.
pub const ERROR_SUFFIX: &str = ".error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    /// File to read.
    pub src: PathBuf,
    /// Final destination. A file only ever appears here through an atomic rename.
    pub dst: PathBuf,
    /// Where the worker writes bytes while the copy is in flight.
    pub dst_tmp: PathBuf,
    /// Sidecar recording the last failure for `dst`.
    pub dst_error: PathBuf,
}
