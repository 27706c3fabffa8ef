//! trackmark - Main entry point
//!
//! Takes one or more track files plus a watermark clip (the last input
//! path) and writes a watermarked MP3 per track, processing tracks in
//! parallel.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trackmark::config::PipelineConfig;
use trackmark::job::{dispatch_jobs, Job};

/// Command-line arguments for trackmark
#[derive(Parser, Debug)]
#[command(name = "trackmark")]
#[command(about = "Stamps each track with a repeating watermark clip, outputting an MP3 per track")]
#[command(version)]
struct Args {
    /// Input audio files; the last path is the watermark clip
    #[arg(required = true, num_args = 1.., value_name = "TRACKS... WATERMARK")]
    inputs: Vec<PathBuf>,

    /// Output MP3 paths, paired with the tracks in order; missing entries
    /// default to `<track>-prev.mp3` next to each track
    #[arg(long, value_name = "PATH", num_args = 1..)]
    output: Vec<PathBuf>,

    /// Output MP3 sample rate in hertz
    #[arg(long, default_value_t = 44_100)]
    samplerate: u32,

    /// Output MP3 bitrate in kbit/s
    #[arg(long, default_value_t = 128)]
    bitrate: u32,

    /// Time in milliseconds before the watermark is first heard
    #[arg(long = "watermark-begin", default_value_t = 3_000)]
    watermark_begin: u32,

    /// Time in milliseconds between watermark repeats
    #[arg(long = "watermark-gap", default_value_t = 10_000)]
    watermark_gap: u32,

    /// Watermark volume multiplier (1.0 leaves the clip unchanged)
    #[arg(long = "watermark-volume", default_value_t = 1.0)]
    watermark_volume: f64,

    /// Maximum number of worker threads (raised to the host's hardware
    /// concurrency when smaller)
    #[arg(long, default_value_t = 8)]
    threads: usize,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trackmark=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut tracks = args.inputs;
    // The watermark clip is always the last input path
    let watermark = match tracks.pop() {
        Some(path) => path,
        None => unreachable!("clap requires at least one input"),
    };

    if tracks.is_empty() {
        info!("no tracks supplied, nothing to do");
        return Ok(());
    }

    let outputs = resolve_outputs(&tracks, args.output);

    let jobs: Vec<Job> = tracks
        .iter()
        .zip(&outputs)
        .enumerate()
        .map(|(id, (track_path, output_path))| Job {
            id,
            track_path: track_path.clone(),
            watermark_path: watermark.clone(),
            output_path: output_path.clone(),
            sample_rate: args.samplerate,
            bitrate_kbps: args.bitrate,
            wmark_offset_ms: args.watermark_begin,
            wmark_gap_ms: args.watermark_gap,
            wmark_volume: args.watermark_volume,
        })
        .collect();

    let config = PipelineConfig::default();
    let outcomes = dispatch_jobs(&jobs, args.threads, &config)?;

    let mut failed = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(stats) => info!(
                track = %outcome.track_path.display(),
                frames = stats.frames,
                bytes = stats.bytes_written,
                "done"
            ),
            Err(e) => {
                failed += 1;
                error!(track = %outcome.track_path.display(), "failed: {}", e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} jobs failed", failed, outcomes.len());
    }
    Ok(())
}

/// Pair each track with an output path, deriving `<stem>-prev.mp3` next to
/// the track for any track without an explicit output.
fn resolve_outputs(tracks: &[PathBuf], mut outputs: Vec<PathBuf>) -> Vec<PathBuf> {
    outputs.truncate(tracks.len());
    for track in &tracks[outputs.len()..] {
        outputs.push(default_output_path(track));
    }
    outputs
}

fn default_output_path(track: &Path) -> PathBuf {
    let stem = track
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "track".to_string());
    track.with_file_name(format!("{}-prev.mp3", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/music/song.flac")),
            PathBuf::from("/music/song-prev.mp3")
        );
    }

    #[test]
    fn test_resolve_outputs_fills_missing() {
        let tracks = vec![PathBuf::from("a.mp3"), PathBuf::from("b.mp3")];
        let outputs = resolve_outputs(&tracks, vec![PathBuf::from("custom.mp3")]);

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0], PathBuf::from("custom.mp3"));
        assert_eq!(outputs[1], PathBuf::from("b-prev.mp3"));
    }

    #[test]
    fn test_resolve_outputs_ignores_extras() {
        let tracks = vec![PathBuf::from("a.mp3")];
        let outputs = resolve_outputs(
            &tracks,
            vec![PathBuf::from("x.mp3"), PathBuf::from("y.mp3")],
        );

        assert_eq!(outputs, vec![PathBuf::from("x.mp3")]);
    }
}
