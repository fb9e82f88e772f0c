//! TreeMirror: resumable directory mirroring.
//!
//! Thin binary entry point. All logic lives in the `treemirror-core` crate.

mod cli;

use clap::Parser;
use std::process::ExitCode;
use treemirror_core::events::TracingSink;
use treemirror_core::Mirror;

/// Exit status when the run finished but part of the source was not mirrored.
const EXIT_RETRY_NEEDED: u8 = 2;

fn main() -> anyhow::Result<ExitCode> {
    let cli = cli::Cli::parse();

    // Initialise structured logging.
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.run_config()?;
    tracing::info!("TreeMirror starting");

    let summary = Mirror::new(config).run(&TracingSink)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if summary.retry_needed() > 0 {
        tracing::warn!(
            "{} file(s) left an error marker; run again to retry them",
            summary.retry_needed()
        );
    }
    if summary.list_failures > 0 {
        tracing::warn!(
            "{} director(ies) could not be listed; see the traversal log",
            summary.list_failures
        );
    }
    if summary.is_incomplete() {
        return Ok(ExitCode::from(EXIT_RETRY_NEEDED));
    }
    Ok(ExitCode::SUCCESS)
}
