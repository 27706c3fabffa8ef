//! Job orchestrator
//!
//! Owns the full lifecycle of one job's resources and drives the
//! read -> schedule -> mix -> encode -> write loop until the track is
//! exhausted, then flushes the encoder. All resources are released on
//! scope exit whatever the loop's outcome; a job that aborts mid-stream
//! leaves its partially written output on disk.

use crate::audio::{Mp3Encoder, PcmReader, SampleBlock};
use crate::config::{PipelineConfig, CHANNELS};
use crate::error::{Error, Result};
use crate::job::{Job, JobStats};
use crate::watermark::{mix_into, WatermarkScheduler};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::info;

/// Run one watermarking job to completion.
pub fn run_job(job: &Job, config: &PipelineConfig) -> Result<JobStats> {
    info!(
        job = job.id,
        track = %job.track_path.display(),
        output = %job.output_path.display(),
        "watermarking track"
    );

    // The sink is opened first so a bad output path is reported before any
    // decoding begins
    let out_file = File::create(&job.output_path).map_err(|e| Error::OutputOpen {
        path: job.output_path.clone(),
        source: e,
    })?;
    let mut sink = BufWriter::new(out_file);

    let mut track = PcmReader::open(&job.track_path, job.sample_rate).map_err(|e| {
        Error::TrackOpen {
            path: job.track_path.clone(),
            reason: e.to_string(),
        }
    })?;
    let mut clip = PcmReader::open(&job.watermark_path, job.sample_rate).map_err(|e| {
        Error::WatermarkOpen {
            path: job.watermark_path.clone(),
            reason: e.to_string(),
        }
    })?;

    let mut encoder = Mp3Encoder::new(
        CHANNELS as u8,
        job.sample_rate,
        job.bitrate_kbps,
        config.mp3_quality,
        config.mp3_buffer_bytes,
    )?;

    let mut scheduler = WatermarkScheduler::new(job.wmark_offset_ms, job.wmark_gap_ms, job.sample_rate);

    // Block buffers are allocated once and reused every iteration
    let mut track_block = SampleBlock::new(config.block_frames);
    let mut clip_block = SampleBlock::new(config.block_frames);

    let mut frames: u64 = 0;
    let mut bytes_written: u64 = 0;

    loop {
        let track_frames = track.read(track_block.buf_mut())?;
        if track_frames == 0 {
            break;
        }
        track_block.set_frames(track_frames);

        let clip_frames = scheduler.advance(&mut clip, &mut clip_block, track_frames)?;
        if clip_frames > 0 {
            mix_into(track_block.buf_mut(), clip_block.samples(), job.wmark_volume);
        }

        let bytes = encoder.encode(track_block.samples())?;
        if !bytes.is_empty() {
            sink.write_all(bytes)?;
            bytes_written += bytes.len() as u64;
        }

        frames += track_frames as u64;
    }

    let tail = encoder.flush()?;
    if !tail.is_empty() {
        sink.write_all(tail)?;
        bytes_written += tail.len() as u64;
    }
    sink.flush()?;

    info!(
        job = job.id,
        frames,
        bytes = bytes_written,
        output = %job.output_path.display(),
        "watermarking complete"
    );

    Ok(JobStats {
        frames,
        bytes_written,
    })
}
