//! Track storage contract
//!
//! A [`Track`] is the host's random-access sample storage. The engine never
//! owns the samples: it reads bounded blocks, transforms them and writes
//! them back through this trait.

use crate::error::Result;

/// Random-access, possibly multi-channel sample storage
///
/// Positions are absolute sample indices from time zero. A track that starts
/// at 2.0 s on a 48 kHz timeline has its first sample at position 96000.
pub trait Track {
    /// Display name (used in progress messages)
    fn name(&self) -> &str;

    /// Sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Number of channels processed together when linked
    fn channel_count(&self) -> usize;

    /// Time of the first sample, in seconds
    fn start_time(&self) -> f64;

    /// Time just past the last sample, in seconds
    fn end_time(&self) -> f64;

    /// Convert a time in seconds to the nearest sample position
    fn time_to_samples(&self, time: f64) -> u64 {
        (time * f64::from(self.sample_rate())).round().max(0.0) as u64
    }

    /// Natural block length starting at `position`
    ///
    /// Storage that keeps samples in blocks should report the samples left in
    /// the block containing `position`, so reads never straddle two blocks.
    fn best_block_size(&self, position: u64) -> usize;

    /// Largest block [`Track::best_block_size`] will ever report
    fn max_block_size(&self) -> usize;

    /// Read `out.len()` samples of `channel` starting at `position`
    ///
    /// Samples outside the track are zero-filled. Returns how many of the
    /// requested samples lie inside the track, never more than `out.len()`.
    fn read(&self, channel: usize, position: u64, out: &mut [f32]) -> Result<usize>;

    /// Overwrite samples of `channel` starting at `position`
    ///
    /// Samples falling outside the track are dropped; writes never extend it.
    fn write(&mut self, channel: usize, position: u64, samples: &[f32]) -> Result<()>;
}

/// Half-open sample range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleRange {
    pub start: u64,
    pub end: u64,
}

impl SampleRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of samples in the range (0 when `end <= start`)
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Channels of one track read and written in lockstep
///
/// In independent mode every channel forms its own group; in linked mode all
/// channels of a track share one group and identical block boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGroup {
    channels: Vec<usize>,
}

impl ChannelGroup {
    /// Group holding a single channel
    pub fn single(channel: usize) -> Self {
        Self {
            channels: vec![channel],
        }
    }

    /// Group holding channels `0..count`
    pub fn linked(count: usize) -> Self {
        Self {
            channels: (0..count).collect(),
        }
    }

    /// Split a track into groups
    pub fn for_track<T: Track + ?Sized>(track: &T, independent: bool) -> Vec<Self> {
        if independent {
            (0..track.channel_count()).map(Self::single).collect()
        } else {
            vec![Self::linked(track.channel_count())]
        }
    }

    pub fn channels(&self) -> &[usize] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Time selection `[t0, t1)` in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub t0: f64,
    pub t1: f64,
}

impl Selection {
    pub fn new(t0: f64, t1: f64) -> Self {
        Self { t0, t1 }
    }

    /// Selection covering every track entirely
    pub fn whole() -> Self {
        Self {
            t0: f64::NEG_INFINITY,
            t1: f64::INFINITY,
        }
    }

    /// Clip the selection to a track's extent
    ///
    /// Returns `None` when nothing of the track lies inside the selection.
    pub fn clip<T: Track + ?Sized>(&self, track: &T) -> Option<SampleRange> {
        let t0 = self.t0.max(track.start_time());
        let t1 = self.t1.min(track.end_time());
        if t1 <= t0 {
            return None;
        }

        let range = SampleRange::new(track.time_to_samples(t0), track.time_to_samples(t1));
        if range.is_empty() {
            None
        } else {
            Some(range)
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::whole()
    }
}
