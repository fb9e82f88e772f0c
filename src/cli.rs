//! Command-line arguments, parsed with clap's derive macros.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use treemirror_core::config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_LOG_FILE_NAME, DEFAULT_PROGRESS_REPORT_DELAY, DEFAULT_STALL_TIMEOUT,
};
use treemirror_core::{CopyConfig, RunConfig};

/// Mirror a directory tree, retrying only what is missing or broken.
///
/// Files already present at the destination are skipped. Failed or stalled
/// copies leave a `<name>.error` marker next to the intended destination;
/// running again retries exactly those files.
#[derive(Parser, Debug)]
#[command(name = "treemirror")]
#[command(version)]
pub struct Cli {
    /// Directory (or single file) to mirror.
    pub source: PathBuf,

    /// Directory the source tree is mirrored onto.
    pub destination: PathBuf,

    /// Bytes copied per chunk.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Milliseconds to wait for progress before logging an idle tick.
    #[arg(long, default_value_t = DEFAULT_PROGRESS_REPORT_DELAY.as_millis() as u64)]
    pub report_delay_ms: u64,

    /// Milliseconds without progress after which a copy is abandoned.
    #[arg(long, default_value_t = DEFAULT_STALL_TIMEOUT.as_millis() as u64)]
    pub stall_timeout_ms: u64,

    /// Traversal log file name, created under the destination.
    ///
    /// Change it when the source root holds a file of the same name, e.g.
    /// when mirroring an earlier mirror.
    #[arg(long, default_value = DEFAULT_LOG_FILE_NAME)]
    pub log_file: String,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Log every visited path and idle poll.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Build the run configuration, resolving relative roots against the
    /// current directory.
    pub fn run_config(&self) -> std::io::Result<RunConfig> {
        let copy = CopyConfig {
            chunk_size: self.chunk_size,
            progress_report_delay: Duration::from_millis(self.report_delay_ms),
            stall_timeout: Duration::from_millis(self.stall_timeout_ms),
        };
        Ok(RunConfig::new(
            std::path::absolute(&self.source)?,
            std::path::absolute(&self.destination)?,
        )
        .with_copy_config(copy)
        .with_log_file_name(&self.log_file))
    }
}
