/// TreeMirror Core: traversal, planning, and supervised file copies.
///
/// This crate contains all mirroring logic with zero CLI dependencies.
/// It is designed to be reusable across different frontends (CLI, service, tests).
///
/// # Modules
///
/// - [`model`]: Traversal entries, copy tasks, outcomes, and run summaries.
/// - [`walker`]: Lazy, single-pass source tree traversal.
/// - [`plan`]: Deterministic copy planning and whole-plan validation.
/// - [`engine`]: One supervised, stall-bounded copy per task.
/// - [`mirror`]: Orchestrates a full run from traversal to outcomes.
/// - [`config`]: Run and copy tunables.
/// - [`events`]: Structured run events and the sinks that receive them.
/// - [`error`]: Fatal error taxonomy.
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod mirror;
pub mod model;
pub mod plan;
pub mod walker;

pub use config::{CopyConfig, RunConfig};
pub use error::{ConfigError, MirrorError};
pub use mirror::Mirror;
