//! Error types for trackmark
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//!
//! Every failure aborts only the job that encountered it; the dispatcher
//! records the error in that job's outcome and keeps running the rest.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for trackmark
#[derive(Error, Debug)]
pub enum Error {
    /// Output file could not be created or opened for writing
    #[error("failed to open output file {}: {source}", path.display())]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Track audio file could not be opened or probed
    #[error("failed to open track {}: {reason}", path.display())]
    TrackOpen { path: PathBuf, reason: String },

    /// Watermark clip could not be opened or probed
    #[error("failed to open watermark clip {}: {reason}", path.display())]
    WatermarkOpen { path: PathBuf, reason: String },

    /// Encoder context could not be created
    #[error("encoder initialization failed: {0}")]
    EncoderInit(String),

    /// Encoder rejected a stream parameter (bitrate, sample rate, quality)
    #[error("encoder rejected parameters: {0}")]
    EncoderParams(String),

    /// Encoding a block failed mid-stream
    #[error("encoding failed: {0}")]
    Encode(String),

    /// Audio decoding errors
    #[error("audio decode error: {0}")]
    Decode(String),

    /// File I/O errors
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using trackmark Error
pub type Result<T> = std::result::Result<T, Error>;
