//! Streaming sample rate conversion using rubato
//!
//! Decoded packets arrive in arbitrary sizes, while `FastFixedIn` wants a
//! fixed input chunk. The resampler accumulates interleaved input until a
//! full chunk is available, converts chunk by chunk, and drains the final
//! partial chunk when the stream ends.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};

/// Input frames handed to rubato per conversion call.
const CHUNK_FRAMES: usize = 1024;

/// Chunked resampler for one PCM stream.
pub struct StreamResampler {
    inner: FastFixedIn<f32>,
    channels: usize,

    /// Interleaved input accumulated until a full chunk is available
    pending: Vec<f32>,
}

impl StreamResampler {
    /// Create a resampler converting `input_rate` to `output_rate`.
    pub fn new(input_rate: u32, output_rate: u32, channels: usize) -> Result<Self> {
        let inner = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // ratio is fixed for the life of the stream
            PolynomialDegree::Septic,
            CHUNK_FRAMES,
            channels,
        )
        .map_err(|e| Error::Decode(format!("failed to create resampler: {}", e)))?;

        Ok(Self {
            inner,
            channels,
            pending: Vec::new(),
        })
    }

    /// Feed interleaved input samples, appending any resampled output to `out`.
    pub fn push(&mut self, interleaved: &[f32], out: &mut Vec<f32>) -> Result<()> {
        self.pending.extend_from_slice(interleaved);

        let chunk_samples = CHUNK_FRAMES * self.channels;
        let mut consumed = 0;
        while self.pending.len() - consumed >= chunk_samples {
            let chunk = &self.pending[consumed..consumed + chunk_samples];
            let planar = deinterleave(chunk, self.channels);
            let resampled = self
                .inner
                .process(&planar, None)
                .map_err(|e| Error::Decode(format!("resampling failed: {}", e)))?;
            interleave_into(&resampled, out);
            consumed += chunk_samples;
        }
        self.pending.drain(..consumed);

        Ok(())
    }

    /// Convert whatever input remains, appending the output to `out`.
    ///
    /// Call once at end of stream; afterwards only `reset` is meaningful.
    pub fn finish(&mut self, out: &mut Vec<f32>) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let planar = deinterleave(&self.pending, self.channels);
        let resampled = self
            .inner
            .process_partial(Some(&planar), None)
            .map_err(|e| Error::Decode(format!("resampling failed: {}", e)))?;
        interleave_into(&resampled, out);
        self.pending.clear();

        Ok(())
    }

    /// Discard accumulated input and internal filter state.
    pub fn reset(&mut self) {
        self.inner.reset();
        self.pending.clear();
    }
}

/// Convert interleaved samples to planar format.
///
/// Input:  [L, R, L, R, ...]
/// Output: [[L, L, ...], [R, R, ...]]
fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];

    for frame in 0..frames {
        for ch in 0..channels {
            planar[ch].push(samples[frame * channels + ch]);
        }
    }

    planar
}

/// Append planar samples to an interleaved output buffer.
fn interleave_into(planar: &[Vec<f32>], out: &mut Vec<f32>) {
    if planar.is_empty() {
        return;
    }

    let channels = planar.len();
    let frames = planar[0].len();
    out.reserve(frames * channels);

    for frame in 0..frames {
        for ch in 0..channels {
            out.push(planar[ch][frame]);
        }
    }
}
