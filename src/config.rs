//! Pipeline configuration
//!
//! The per-job processing constants live in a single immutable struct that
//! the caller constructs once and passes by reference into each job, rather
//! than as process-wide state.

/// Channel count used throughout the pipeline.
///
/// Both the track and the watermark clip are normalized to interleaved
/// stereo before mixing, and the encoder is initialized for two channels.
pub const CHANNELS: usize = 2;

/// Processing constants shared by every job in one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Frames decoded, mixed, and encoded per loop iteration.
    ///
    /// Fixed for the whole job; bounds peak memory and sets the granularity
    /// of the watermark scheduler's countdown.
    pub block_frames: usize,

    /// Initial capacity of the encoder's staging buffer in bytes.
    pub mp3_buffer_bytes: usize,

    /// LAME quality algorithm level (0 = best/slowest, 9 = worst/fastest).
    pub mp3_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_frames: 8192,
            mp3_buffer_bytes: 65536,
            mp3_quality: 2,
        }
    }
}
