//! # trackmark
//!
//! Stamps audio tracks with a repeating watermark clip and re-encodes the
//! result as MP3, once per input track.
//!
//! **Purpose:** Produce watermarked preview deliverables offline: decode a
//! track and a watermark clip to a common PCM format, mix the clip into the
//! track on a configurable schedule (initial delay, then a repeating gap),
//! and stream the mixed audio through an MP3 encoder.
//!
//! **Architecture:** symphonia + rubato decode both sources to interleaved
//! stereo i16 at one sample rate; a frame-counted scheduler decides when the
//! clip is audible; blocks are mixed in place and encoded with LAME. Tracks
//! are processed in parallel on a bounded rayon pool, one independent job
//! per track.

pub mod audio;
pub mod config;
pub mod error;
pub mod job;
pub mod watermark;

pub use error::{Error, Result};
