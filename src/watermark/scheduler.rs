//! Watermark playback scheduler
//!
//! A two-state machine {SILENT, PLAYING} deciding, once per loop iteration,
//! whether the watermark clip is read and mixed this iteration. Its clock is
//! the track's decode cadence: the countdown to the next transition is
//! measured in track frames, not wall time.
//!
//! # Transition rules
//!
//! Evaluated once per iteration, before the countdown decrement:
//! - PLAYING and the clip read returned no frames (clip exhausted): go
//!   SILENT, reset the countdown to the configured gap, rewind the clip.
//! - SILENT and the countdown reached zero: go PLAYING, reset the countdown,
//!   rewind the clip. The clip is first read on the following iteration.
//!
//! A failed rewind is reported and playback continues; the rewind is retried
//! at the next transition.

use crate::audio::SampleBlock;
use crate::error::Result;
use tracing::warn;

/// Streaming source for the watermark clip.
///
/// The seam exists so the scheduler can be driven by an in-memory clip in
/// tests; the production implementation is [`crate::audio::PcmReader`].
pub trait ClipSource {
    /// Fill `out` with up to `out.len() / 2` interleaved stereo frames.
    /// Returns frames read; 0 means the clip is exhausted.
    fn read(&mut self, out: &mut [i16]) -> Result<usize>;

    /// Seek back to frame 0.
    fn rewind(&mut self) -> Result<()>;
}

/// Scheduler state for one job's watermark cycle.
#[derive(Debug)]
pub struct WatermarkScheduler {
    /// True while the clip is audible
    playing: bool,

    /// Track frames until the next SILENT -> PLAYING transition.
    /// Unused for edge detection while playing (the clip's own exhaustion
    /// ends playback), but still decremented and reset at every transition.
    frames_until_transition: u64,

    /// Gap between watermark repeats, in track frames
    gap_frames: u64,
}

impl WatermarkScheduler {
    /// Create a scheduler.
    ///
    /// With a zero start offset the watermark is audible from the first
    /// block; otherwise playback begins once `start_offset_ms` worth of
    /// track frames have been consumed.
    pub fn new(start_offset_ms: u32, gap_ms: u32, sample_rate: u32) -> Self {
        let playing = start_offset_ms == 0;
        Self {
            playing,
            frames_until_transition: if playing {
                0
            } else {
                ms_to_frames(start_offset_ms, sample_rate)
            },
            gap_frames: ms_to_frames(gap_ms, sample_rate),
        }
    }

    /// True while the clip is audible.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Track frames until the next SILENT -> PLAYING transition.
    pub fn frames_until_transition(&self) -> u64 {
        self.frames_until_transition
    }

    /// Per-iteration update: read the clip if playing, run the transition
    /// rules, then decrement the countdown by the track frames consumed
    /// this iteration.
    ///
    /// Returns the clip frames read into `block` (0 while silent, and on
    /// the exhaustion and transition iterations).
    pub fn advance(
        &mut self,
        clip: &mut dyn ClipSource,
        block: &mut SampleBlock,
        track_frames: usize,
    ) -> Result<usize> {
        let mut clip_frames = 0;

        if self.playing {
            clip_frames = clip.read(block.buf_mut())?;
            if clip_frames == 0 {
                // Clip exhausted: start the gap
                self.playing = false;
                self.frames_until_transition = self.gap_frames;
                self.rewind_clip(clip);
            }
        } else if self.frames_until_transition == 0 {
            // Gap elapsed: the clip becomes audible next iteration
            self.playing = true;
            self.frames_until_transition = self.gap_frames;
            self.rewind_clip(clip);
        }
        block.set_frames(clip_frames);

        self.frames_until_transition = self
            .frames_until_transition
            .saturating_sub(track_frames as u64);

        Ok(clip_frames)
    }

    /// Rewind failure is non-fatal: the clip keeps its position and the
    /// rewind is retried implicitly at the next transition.
    fn rewind_clip(&self, clip: &mut dyn ClipSource) {
        if let Err(e) = clip.rewind() {
            warn!("failed to rewind watermark clip: {}", e);
        }
    }
}

/// Convert a millisecond duration to frames at `sample_rate`, rounding to
/// the nearest frame.
pub(crate) fn ms_to_frames(ms: u32, sample_rate: u32) -> u64 {
    (ms as f64 / 1000.0 * sample_rate as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CHANNELS;
    use crate::error::Error;

    /// In-memory clip of a constant sample value.
    struct StubClip {
        total_frames: usize,
        position: usize,
        rewinds: usize,
        fail_rewind: bool,
        value: i16,
    }

    impl StubClip {
        fn new(total_frames: usize, value: i16) -> Self {
            Self {
                total_frames,
                position: 0,
                rewinds: 0,
                fail_rewind: false,
                value,
            }
        }
    }

    impl ClipSource for StubClip {
        fn read(&mut self, out: &mut [i16]) -> Result<usize> {
            let capacity = out.len() / CHANNELS;
            let frames = capacity.min(self.total_frames - self.position);
            for slot in out[..frames * CHANNELS].iter_mut() {
                *slot = self.value;
            }
            self.position += frames;
            Ok(frames)
        }

        fn rewind(&mut self) -> Result<()> {
            self.rewinds += 1;
            if self.fail_rewind {
                return Err(Error::Decode("rewind refused".to_string()));
            }
            self.position = 0;
            Ok(())
        }
    }

    const BLOCK_FRAMES: usize = 4;
    const RATE: u32 = 1000; // 1 frame per ms keeps the arithmetic readable

    fn advance(
        scheduler: &mut WatermarkScheduler,
        clip: &mut StubClip,
        block: &mut SampleBlock,
    ) -> usize {
        scheduler.advance(clip, block, BLOCK_FRAMES).unwrap()
    }

    #[test]
    fn test_zero_offset_starts_playing() {
        let mut scheduler = WatermarkScheduler::new(0, 50, RATE);
        assert!(scheduler.is_playing());

        let mut clip = StubClip::new(100, 7);
        let mut block = SampleBlock::new(BLOCK_FRAMES);
        let frames = advance(&mut scheduler, &mut clip, &mut block);

        assert_eq!(frames, BLOCK_FRAMES, "audible from the first block");
        assert_eq!(block.samples(), &[7; BLOCK_FRAMES * CHANNELS]);
    }

    #[test]
    fn test_offset_converts_to_frames() {
        let scheduler = WatermarkScheduler::new(10, 50, RATE);
        assert!(!scheduler.is_playing());
        assert_eq!(scheduler.frames_until_transition(), 10);

        // Rounding, not truncation
        assert_eq!(ms_to_frames(333, 44100), 14685);
        assert_eq!(ms_to_frames(1, 44100), 44);
        assert_eq!(ms_to_frames(0, 44100), 0);
    }

    #[test]
    fn test_offset_delays_first_playback_within_granularity() {
        let offset_ms = 10;
        let mut scheduler = WatermarkScheduler::new(offset_ms, 50, RATE);
        let mut clip = StubClip::new(100, 1);
        let mut block = SampleBlock::new(BLOCK_FRAMES);

        let mut track_frames_before_audible = 0;
        loop {
            let frames = advance(&mut scheduler, &mut clip, &mut block);
            if frames > 0 {
                break;
            }
            track_frames_before_audible += BLOCK_FRAMES;
        }

        let expected = ms_to_frames(offset_ms, RATE);
        // The countdown is only checked at block boundaries, and the clip is
        // first read on the iteration after the transition.
        assert!(track_frames_before_audible as u64 >= expected);
        assert!((track_frames_before_audible as u64) < expected + 2 * BLOCK_FRAMES as u64);
    }

    #[test]
    fn test_full_cycle_rewinds_once_per_transition() {
        let gap_ms = 50;
        let mut scheduler = WatermarkScheduler::new(0, gap_ms, RATE);
        let mut clip = StubClip::new(10, 1);
        let mut block = SampleBlock::new(BLOCK_FRAMES);

        // Clip drains over 4, 4, 2 frames
        assert_eq!(advance(&mut scheduler, &mut clip, &mut block), 4);
        assert_eq!(advance(&mut scheduler, &mut clip, &mut block), 4);
        assert_eq!(advance(&mut scheduler, &mut clip, &mut block), 2);
        assert!(scheduler.is_playing());

        // Exhaustion detected: gap begins, clip rewound once
        assert_eq!(advance(&mut scheduler, &mut clip, &mut block), 0);
        assert!(!scheduler.is_playing());
        assert_eq!(clip.rewinds, 1);

        // Silent until the gap elapses, then one transition iteration
        let mut silent_advances = 0;
        loop {
            let frames = advance(&mut scheduler, &mut clip, &mut block);
            if frames > 0 {
                break;
            }
            silent_advances += 1;
            assert!(silent_advances < 100, "scheduler never resumed");
        }

        // Gap of 50 frames at 4 frames per iteration: 12 countdown
        // iterations plus the transition iteration
        assert_eq!(silent_advances, 13);
        assert_eq!(clip.rewinds, 2);
        // Replay starts from frame 0
        assert_eq!(clip.position, BLOCK_FRAMES);
    }

    #[test]
    fn test_clip_longer_than_gap_ends_by_exhaustion() {
        // Gap shorter than the clip: the countdown reaches zero while the
        // clip is still audible, but only exhaustion ends playback.
        let mut scheduler = WatermarkScheduler::new(0, 8, RATE);
        let mut clip = StubClip::new(40, 1);
        let mut block = SampleBlock::new(BLOCK_FRAMES);

        for _ in 0..10 {
            assert_eq!(advance(&mut scheduler, &mut clip, &mut block), 4);
            assert!(scheduler.is_playing(), "timer expiry must not cut playback");
        }

        assert_eq!(advance(&mut scheduler, &mut clip, &mut block), 0);
        assert!(!scheduler.is_playing());
    }

    #[test]
    fn test_countdown_clamps_at_zero() {
        let mut scheduler = WatermarkScheduler::new(2, 50, RATE);
        let mut clip = StubClip::new(10, 1);
        let mut block = SampleBlock::new(BLOCK_FRAMES);

        // Countdown of 2 decremented by a 4-frame block clamps to zero
        advance(&mut scheduler, &mut clip, &mut block);
        assert_eq!(scheduler.frames_until_transition(), 0);
    }

    #[test]
    fn test_rewind_failure_is_not_fatal() {
        let mut scheduler = WatermarkScheduler::new(0, 8, RATE);
        let mut clip = StubClip::new(4, 1);
        clip.fail_rewind = true;
        let mut block = SampleBlock::new(BLOCK_FRAMES);

        assert_eq!(advance(&mut scheduler, &mut clip, &mut block), 4);
        // Exhaustion: the rewind fails but the scheduler still transitions
        assert_eq!(advance(&mut scheduler, &mut clip, &mut block), 0);
        assert!(!scheduler.is_playing());
        assert_eq!(clip.rewinds, 1);
    }

    #[test]
    fn test_identical_runs_produce_identical_schedules() {
        let run = || {
            let mut scheduler = WatermarkScheduler::new(10, 30, RATE);
            let mut clip = StubClip::new(10, 1);
            let mut block = SampleBlock::new(BLOCK_FRAMES);
            (0..50)
                .map(|_| advance(&mut scheduler, &mut clip, &mut block))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }
}
