//! Audio test file generation utilities
//!
//! Generates deterministic WAV files with known characteristics for
//! pipeline testing: silent audio and sine tones.

use hound::{WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;

/// Generate a silent stereo WAV file.
///
/// # Arguments
/// * `path` - Output file path
/// * `sample_rate` - Sample rate in Hz
/// * `duration_ms` - Duration in milliseconds
pub fn generate_silent_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    duration_ms: u64,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;

    let total_frames = (sample_rate as u64 * duration_ms) / 1000;
    for _ in 0..total_frames * 2 {
        writer.write_sample(0i16)?;
    }

    writer.finalize()?;
    Ok(())
}

/// Generate a sine wave stereo WAV file.
///
/// # Arguments
/// * `path` - Output file path
/// * `sample_rate` - Sample rate in Hz
/// * `duration_ms` - Duration in milliseconds
/// * `frequency_hz` - Sine frequency in Hz (e.g. 440.0 for A4)
/// * `amplitude` - Amplitude 0.0-1.0 (0.5 recommended to avoid clipping)
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    duration_ms: u64,
    frequency_hz: f32,
    amplitude: f32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;

    let total_frames = (sample_rate as u64 * duration_ms) / 1000;
    let amplitude_i16 = amplitude * i16::MAX as f32;

    for frame in 0..total_frames {
        let t = frame as f32 / sample_rate as f32;
        let sample = ((2.0 * PI * frequency_hz * t).sin() * amplitude_i16) as i16;

        // Same value on both channels
        writer.write_sample(sample)?;
        writer.write_sample(sample)?;
    }

    writer.finalize()?;
    Ok(())
}
