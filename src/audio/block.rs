//! Reusable PCM sample blocks
//!
//! One block holds up to a fixed number of interleaved stereo i16 frames.
//! Each job allocates its blocks once and refills them every loop iteration,
//! so the steady-state loop performs no allocation.

use crate::config::CHANNELS;

/// Fixed-capacity buffer of interleaved stereo samples.
///
/// # Examples
///
/// ```ignore
/// let mut block = SampleBlock::new(8192);
/// let frames = reader.read(block.buf_mut())?;
/// block.set_frames(frames);
/// encode(block.samples());
/// ```
#[derive(Debug)]
pub struct SampleBlock {
    /// Interleaved samples [L, R, L, R, ...], capacity_frames * CHANNELS long
    samples: Vec<i16>,

    /// Frames valid since the last fill
    frames: usize,
}

impl SampleBlock {
    /// Create a block able to hold `capacity_frames` stereo frames.
    pub fn new(capacity_frames: usize) -> Self {
        Self {
            samples: vec![0; capacity_frames * CHANNELS],
            frames: 0,
        }
    }

    /// Capacity in frames.
    pub fn capacity_frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    /// Frames valid from the last fill.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Full-capacity mutable sample slice for a source to fill.
    pub fn buf_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }

    /// Record how many frames the last fill produced.
    ///
    /// # Panics
    /// Panics if `frames` exceeds the block capacity.
    pub fn set_frames(&mut self, frames: usize) {
        assert!(frames <= self.capacity_frames());
        self.frames = frames;
    }

    /// Valid interleaved samples from the last fill.
    pub fn samples(&self) -> &[i16] {
        &self.samples[..self.frames * CHANNELS]
    }
}
