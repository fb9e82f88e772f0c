/// Terminal outcomes of copy tasks and the per-run summary built from them.
use crate::model::size::{format_rate, format_size};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Error marker content written when a copy stalls.
pub const TIMEOUT_MARKER: &str = "timeout";

/// How one copy task ended.
///
/// Outcomes are not persisted; the sidecar file and the presence of the
/// final file are the only durable record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The destination already existed as a regular file.
    Skipped,
    /// Bytes were copied and the file was renamed into place.
    Copied,
    /// Opening, reading, or writing failed. The message is in the sidecar.
    CopyFailed { message: String },
    /// No progress for longer than the stall timeout.
    TimedOut,
}

impl Outcome {
    /// `true` if the task needs another run to complete.
    pub fn needs_retry(&self) -> bool {
        matches!(self, Outcome::CopyFailed { .. } | Outcome::TimedOut)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Skipped => f.write_str("exists, skipped"),
            Outcome::Copied => f.write_str("copied"),
            Outcome::CopyFailed { message } => write!(f, "failed: {message}"),
            Outcome::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Running totals for one mirror run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    /// Every traversal entry, list failures included.
    pub entries: u64,
    pub list_failures: u64,
    pub skipped: u64,
    pub copied: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub bytes_copied: u64,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            entries: 0,
            list_failures: 0,
            skipped: 0,
            copied: 0,
            failed: 0,
            timed_out: 0,
            bytes_copied: 0,
            duration: Duration::ZERO,
        }
    }

    /// Count one finished task.
    pub fn record(&mut self, outcome: &Outcome, bytes: u64) {
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Copied => {
                self.copied += 1;
                self.bytes_copied += bytes;
            }
            Outcome::CopyFailed { .. } => self.failed += 1,
            Outcome::TimedOut => self.timed_out += 1,
        }
    }

    /// Number of tasks that left a sidecar behind.
    pub fn retry_needed(&self) -> u64 {
        self.failed + self.timed_out
    }

    /// `true` if part of the source was not mirrored: a task needs a retry,
    /// or a directory could not be listed.
    pub fn is_incomplete(&self) -> bool {
        self.retry_needed() > 0 || self.list_failures > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entries={} list_failures={} copied={} ({}, {}) skipped={} failed={} timed_out={} in {:.1?}",
            self.entries,
            self.list_failures,
            self.copied,
            format_size(self.bytes_copied),
            format_rate(self.bytes_copied, self.duration),
            self.skipped,
            self.failed,
            self.timed_out,
            self.duration
        )
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_each_outcome() {
        let mut summary = RunSummary::new(Local::now());
        summary.record(&Outcome::Copied, 10);
        summary.record(&Outcome::Copied, 5);
        summary.record(&Outcome::Skipped, 99);
        summary.record(
            &Outcome::CopyFailed {
                message: "boom".into(),
            },
            3,
        );
        summary.record(&Outcome::TimedOut, 0);

        assert_eq!(summary.copied, 2);
        assert_eq!(summary.bytes_copied, 15, "only copied bytes are counted");
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.retry_needed(), 2);
        assert!(summary.is_incomplete());
    }

    #[test]
    fn list_failure_alone_is_incomplete() {
        let mut summary = RunSummary::new(Local::now());
        summary.record(&Outcome::Copied, 1);
        assert!(!summary.is_incomplete());

        summary.list_failures = 1;
        assert_eq!(summary.retry_needed(), 0);
        assert!(summary.is_incomplete());
    }

    #[test]
    fn retry_flag_per_outcome() {
        assert!(!Outcome::Skipped.needs_retry());
        assert!(!Outcome::Copied.needs_retry());
        assert!(Outcome::TimedOut.needs_retry());
        assert!(Outcome::CopyFailed {
            message: String::new()
        }
        .needs_retry());
    }
}
