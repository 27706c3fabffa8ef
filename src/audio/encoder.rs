//! MP3 stream encoder adapter using mp3lame-encoder
//!
//! Wraps the LAME binding behind the small surface the job loop needs:
//! encode one interleaved block, flush trailing bytes at end of stream.
//! Encoded bytes land in an owned staging buffer that is reused across
//! calls.

use crate::error::{Error, Result};
use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, InterleavedPcm, Quality};

/// MP3 encoder for one output stream.
pub struct Mp3Encoder {
    encoder: mp3lame_encoder::Encoder,

    /// Encoded bytes from the most recent encode/flush call
    staging: Vec<u8>,
}

impl Mp3Encoder {
    /// Initialize a LAME encoder.
    ///
    /// # Arguments
    ///
    /// * `channels` - Output channel count (2 for this pipeline)
    /// * `sample_rate` - Input/output sample rate in Hz
    /// * `bitrate_kbps` - Target bitrate; must be a rate MP3 supports
    /// * `quality` - LAME quality algorithm level, 0 (best) to 9 (fastest)
    /// * `staging_capacity` - Initial staging buffer capacity in bytes
    pub fn new(
        channels: u8,
        sample_rate: u32,
        bitrate_kbps: u32,
        quality: u8,
        staging_capacity: usize,
    ) -> Result<Self> {
        let mut builder = Builder::new()
            .ok_or_else(|| Error::EncoderInit("failed to allocate LAME context".to_string()))?;

        builder
            .set_num_channels(channels)
            .map_err(|e| Error::EncoderParams(format!("channels {}: {:?}", channels, e)))?;
        builder
            .set_sample_rate(sample_rate)
            .map_err(|e| Error::EncoderParams(format!("sample rate {}: {:?}", sample_rate, e)))?;
        builder
            .set_brate(bitrate_from_kbps(bitrate_kbps)?)
            .map_err(|e| Error::EncoderParams(format!("bitrate {}: {:?}", bitrate_kbps, e)))?;
        builder
            .set_quality(quality_from_level(quality)?)
            .map_err(|e| Error::EncoderParams(format!("quality {}: {:?}", quality, e)))?;

        let encoder = builder
            .build()
            .map_err(|e| Error::EncoderInit(format!("{:?}", e)))?;

        Ok(Self {
            encoder,
            staging: Vec::with_capacity(staging_capacity),
        })
    }

    /// Encode one block of interleaved stereo samples.
    ///
    /// Returns the encoded bytes, which may be empty while the codec
    /// accumulates input. The returned slice is valid until the next call.
    pub fn encode(&mut self, interleaved: &[i16]) -> Result<&[u8]> {
        self.staging.clear();
        self.encoder
            .encode_to_vec(InterleavedPcm(interleaved), &mut self.staging)
            .map_err(|e| Error::Encode(format!("{:?}", e)))?;
        Ok(&self.staging)
    }

    /// Flush the encoder at end of stream, returning any trailing bytes.
    pub fn flush(&mut self) -> Result<&[u8]> {
        self.staging.clear();
        self.encoder
            .flush_to_vec::<FlushNoGap>(&mut self.staging)
            .map_err(|e| Error::Encode(format!("{:?}", e)))?;
        Ok(&self.staging)
    }
}

/// Map an integer kbit/s rate onto the bitrates MP3 supports.
fn bitrate_from_kbps(kbps: u32) -> Result<Bitrate> {
    let bitrate = match kbps {
        8 => Bitrate::Kbps8,
        16 => Bitrate::Kbps16,
        24 => Bitrate::Kbps24,
        32 => Bitrate::Kbps32,
        40 => Bitrate::Kbps40,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        80 => Bitrate::Kbps80,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        other => {
            return Err(Error::EncoderParams(format!(
                "unsupported MP3 bitrate: {} kbps",
                other
            )))
        }
    };
    Ok(bitrate)
}

/// Map a 0-9 quality level onto the LAME quality setting.
fn quality_from_level(level: u8) -> Result<Quality> {
    let quality = match level {
        0 => Quality::Best,
        1 => Quality::SecondBest,
        2 => Quality::NearBest,
        3 => Quality::VeryNice,
        4 => Quality::Nice,
        5 => Quality::Good,
        6 => Quality::Decent,
        7 => Quality::Ok,
        8 => Quality::SecondWorst,
        9 => Quality::Worst,
        other => {
            return Err(Error::EncoderParams(format!(
                "unsupported quality level: {}",
                other
            )))
        }
    };
    Ok(quality)
}
