//! PCM source adapter using symphonia
//!
//! Decodes an audio file (MP3, WAV, FLAC, AAC, Vorbis per Cargo.toml
//! features) to interleaved stereo i16 frames at a caller-chosen sample
//! rate, on demand, with support for seeking back to the start.
//!
//! # Sample Format
//!
//! - Output: interleaved stereo i16 [L, R, L, R, ...]
//! - Mono sources: duplicated to stereo
//! - Multi-channel sources: averaged down to stereo
//! - Non-target sample rates: converted with rubato

use crate::audio::resampler::StreamResampler;
use crate::config::CHANNELS;
use crate::error::{Error, Result};
use crate::watermark::ClipSource;
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

/// Streaming PCM source for one audio file.
///
/// # Examples
///
/// ```ignore
/// let mut reader = PcmReader::open("track.mp3", 44100)?;
/// let mut block = vec![0i16; 8192 * 2];
/// loop {
///     let frames = reader.read(&mut block)?;
///     if frames == 0 { break; }
///     // process block[..frames * 2]
/// }
/// ```
pub struct PcmReader {
    /// Symphonia format reader (demuxer)
    format: Box<dyn FormatReader>,

    /// Symphonia decoder for the selected track
    decoder: Box<dyn Decoder>,

    /// Track index being decoded
    track_id: u32,

    /// Sample rate conversion, present when the native rate differs
    /// from the requested output rate
    resampler: Option<StreamResampler>,

    /// Decoded samples awaiting consumption, interleaved stereo i16
    /// at the output rate
    ready: VecDeque<i16>,

    /// Scratch: one packet's worth of interleaved stereo f32
    decode_buf: Vec<f32>,

    /// Scratch: resampler output
    resample_buf: Vec<f32>,

    /// Set once the underlying stream is exhausted
    eof: bool,

    /// Output sample rate
    sample_rate: u32,

    /// Source path, kept for diagnostics
    path: PathBuf,
}

impl PcmReader {
    /// Open an audio file for streaming decode at `sample_rate`.
    pub fn open<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path)
            .map_err(|e| Error::Decode(format!("failed to open {}: {}", path.display(), e)))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Hint the format from the file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("failed to probe {}: {}", path.display(), e)))?;

        let format = probed.format;

        let track = format.default_track().ok_or_else(|| {
            Error::Decode(format!("no audio track found in {}", path.display()))
        })?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let native_rate = codec_params.sample_rate.ok_or_else(|| {
            Error::Decode(format!("sample rate not reported for {}", path.display()))
        })?;

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| {
                Error::Decode(format!(
                    "failed to create decoder for {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let resampler = if native_rate != sample_rate {
            Some(StreamResampler::new(native_rate, sample_rate, CHANNELS)?)
        } else {
            None
        };

        debug!(
            path = %path.display(),
            native_rate,
            target_rate = sample_rate,
            "opened PCM source"
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            resampler,
            ready: VecDeque::new(),
            decode_buf: Vec::new(),
            resample_buf: Vec::new(),
            eof: false,
            sample_rate,
            path,
        })
    }

    /// Fill `out` with up to `out.len() / 2` interleaved stereo frames.
    ///
    /// Returns the number of frames read; 0 means the source is exhausted.
    pub fn read(&mut self, out: &mut [i16]) -> Result<usize> {
        let want = out.len() - out.len() % CHANNELS;

        while self.ready.len() < want && !self.eof {
            self.fill_more()?;
        }

        let mut take = want.min(self.ready.len());
        take -= take % CHANNELS;

        for (slot, sample) in out[..take].iter_mut().zip(self.ready.drain(..take)) {
            *slot = sample;
        }

        Ok(take / CHANNELS)
    }

    /// Seek back to frame 0 and reset all decode state.
    pub fn rewind(&mut self) -> Result<()> {
        self.format
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: 0,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| {
                Error::Decode(format!(
                    "seek to start failed for {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        self.decoder.reset();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
        self.ready.clear();
        self.eof = false;

        Ok(())
    }

    /// Output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Decode one more packet into the ready queue, or mark end of stream.
    fn fill_more(&mut self) -> Result<()> {
        let packet = match self.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                return self.finish_stream();
            }
            Err(e) => {
                warn!("error reading packet from {}: {}", self.path.display(), e);
                return self.finish_stream();
            }
        };

        // Skip packets belonging to other tracks
        if packet.track_id() != self.track_id {
            return Ok(());
        }

        match self.decoder.decode(&packet) {
            Ok(decoded) => {
                self.decode_buf.clear();
                convert_frames(&decoded, &mut self.decode_buf);

                if let Some(resampler) = self.resampler.as_mut() {
                    self.resample_buf.clear();
                    resampler.push(&self.decode_buf, &mut self.resample_buf)?;
                    push_i16(&mut self.ready, &self.resample_buf);
                } else {
                    push_i16(&mut self.ready, &self.decode_buf);
                }
            }
            Err(e) => {
                // Corrupt packets are tolerated; the stream continues
                warn!("decode error in {}: {}", self.path.display(), e);
            }
        }

        Ok(())
    }

    /// Mark end of stream, draining the resampler tail.
    fn finish_stream(&mut self) -> Result<()> {
        if self.eof {
            return Ok(());
        }
        self.eof = true;

        if let Some(resampler) = self.resampler.as_mut() {
            self.resample_buf.clear();
            resampler.finish(&mut self.resample_buf)?;
            push_i16(&mut self.ready, &self.resample_buf);
        }

        Ok(())
    }
}

impl ClipSource for PcmReader {
    fn read(&mut self, out: &mut [i16]) -> Result<usize> {
        PcmReader::read(self, out)
    }

    fn rewind(&mut self) -> Result<()> {
        PcmReader::rewind(self)
    }
}

/// Convert one decoded buffer to interleaved stereo f32.
fn convert_frames(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => interleave_to_stereo(buf, out),
        AudioBufferRef::U16(buf) => interleave_to_stereo(buf, out),
        AudioBufferRef::U24(buf) => interleave_to_stereo(buf, out),
        AudioBufferRef::U32(buf) => interleave_to_stereo(buf, out),
        AudioBufferRef::S8(buf) => interleave_to_stereo(buf, out),
        AudioBufferRef::S16(buf) => interleave_to_stereo(buf, out),
        AudioBufferRef::S24(buf) => interleave_to_stereo(buf, out),
        AudioBufferRef::S32(buf) => interleave_to_stereo(buf, out),
        AudioBufferRef::F32(buf) => interleave_to_stereo(buf, out),
        AudioBufferRef::F64(buf) => interleave_to_stereo(buf, out),
    }
}

/// Interleave a planar buffer to stereo, normalizing the channel count.
fn interleave_to_stereo<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample + IntoSample<f32>,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    out.reserve(frames * CHANNELS);

    match channels {
        1 => {
            // Mono: duplicate to both channels
            for frame in 0..frames {
                let sample: f32 = buf.chan(0)[frame].into_sample();
                out.push(sample);
                out.push(sample);
            }
        }
        2 => {
            for frame in 0..frames {
                out.push(buf.chan(0)[frame].into_sample());
                out.push(buf.chan(1)[frame].into_sample());
            }
        }
        _ => {
            // Multi-channel: average even channels into left, odd into right
            for frame in 0..frames {
                let mut left = 0.0f32;
                let mut right = 0.0f32;
                for ch in 0..channels {
                    let sample: f32 = buf.chan(ch)[frame].into_sample();
                    if ch % 2 == 0 {
                        left += sample;
                    } else {
                        right += sample;
                    }
                }
                let half = channels as f32 / 2.0;
                out.push(left / half);
                out.push(right / half);
            }
        }
    }
}

/// Append normalized f32 samples to the ready queue as i16.
fn push_i16(ready: &mut VecDeque<i16>, samples: &[f32]) {
    for &sample in samples {
        ready.push_back((sample * i16::MAX as f32) as i16);
    }
}
