//! Parallel job dispatch
//!
//! Jobs are embarrassingly parallel at track granularity: each one owns its
//! readers, encoder, and sink, and the only shared resource is the worker
//! pool. A failed job is recorded in its outcome and never stops the rest.

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::job::{run_job, Job, JobOutcome};
use rayon::prelude::*;
use std::num::NonZeroUsize;
use tracing::info;

/// Effective worker count for a requested pool size.
///
/// A request of zero means one worker; requests below the host's hardware
/// concurrency are raised to it.
pub fn effective_workers(requested: usize) -> usize {
    let hardware = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    requested.max(1).max(hardware)
}

/// Run every job on a bounded worker pool, one worker per in-flight job.
///
/// Returns one outcome per job, in input order. An empty job list returns
/// an empty vector without building a pool.
pub fn dispatch_jobs(
    jobs: &[Job],
    requested_workers: usize,
    config: &PipelineConfig,
) -> Result<Vec<JobOutcome>> {
    if jobs.is_empty() {
        return Ok(Vec::new());
    }

    let workers = effective_workers(requested_workers);
    info!(jobs = jobs.len(), workers, "dispatching watermark jobs");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| Error::Internal(format!("failed to build worker pool: {}", e)))?;

    let outcomes = pool.install(|| {
        jobs.par_iter()
            .map(|job| JobOutcome {
                job_id: job.id,
                track_path: job.track_path.clone(),
                result: run_job(job, config),
            })
            .collect()
    });

    Ok(outcomes)
}
