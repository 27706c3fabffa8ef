//! Watermarking jobs
//!
//! One `Job` describes a single track-to-MP3 watermarking task. Jobs are
//! immutable once constructed, owned by the worker that runs them, and
//! share nothing with each other.

pub mod dispatcher;
pub mod orchestrator;

use std::path::PathBuf;

pub use dispatcher::{dispatch_jobs, effective_workers};
pub use orchestrator::run_job;

/// Parameters for one watermarking task.
#[derive(Debug, Clone)]
pub struct Job {
    /// Index of this job within the run, used in logs and outcomes
    pub id: usize,

    /// Track to watermark
    pub track_path: PathBuf,

    /// Watermark clip (shared path, independent reader per job)
    pub watermark_path: PathBuf,

    /// Output MP3 path
    pub output_path: PathBuf,

    /// Output sample rate in Hz; both sources are normalized to it
    pub sample_rate: u32,

    /// Output MP3 bitrate in kbit/s
    pub bitrate_kbps: u32,

    /// Milliseconds of track before the watermark is first heard
    pub wmark_offset_ms: u32,

    /// Milliseconds of silence between watermark repeats
    pub wmark_gap_ms: u32,

    /// Watermark volume multiplier
    pub wmark_volume: f64,
}

/// Diagnostics from a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStats {
    /// Track frames consumed
    pub frames: u64,

    /// Bytes written to the output file
    pub bytes_written: u64,
}

/// Per-job result handed back to the caller.
#[derive(Debug)]
pub struct JobOutcome {
    pub job_id: usize,
    pub track_path: PathBuf,
    pub result: crate::Result<JobStats>,
}
