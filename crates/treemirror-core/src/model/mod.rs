/// Data model for a mirror run.
///
/// Re-exports the traversal entry, copy task, and outcome types.
pub mod entry;
pub mod outcome;
pub mod size;
pub mod task;

pub use entry::FsEntry;
pub use outcome::{Outcome, RunSummary};
pub use task::CopyTask;
