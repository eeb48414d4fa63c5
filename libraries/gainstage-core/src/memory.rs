//! In-memory track storage
//!
//! [`MemoryTrack`] keeps each channel as a list of fixed-size blocks behind
//! `Arc`s. Cloning a track only bumps reference counts, and a write copies
//! just the blocks it touches. That makes "process a working copy, commit on
//! success" cheap for hosts that stage edits the way the engine expects.

use crate::error::{GainstageError, Result};
use crate::track::Track;
use std::sync::Arc;

/// Default storage block length in samples
pub const DEFAULT_BLOCK_SIZE: usize = 65536;

/// Copy-on-write in-memory [`Track`]
#[derive(Debug, Clone)]
pub struct MemoryTrack {
    name: String,
    sample_rate: u32,
    start_sample: u64,
    block_size: usize,
    len: u64,
    channels: Vec<Vec<Arc<Vec<f32>>>>,
}

impl MemoryTrack {
    /// Build a track from planar channel data
    ///
    /// Channels shorter than the longest one are padded with silence.
    pub fn from_channels(name: impl Into<String>, sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self::with_block_size_from(name.into(), sample_rate, channels, DEFAULT_BLOCK_SIZE)
    }

    /// Build a track from interleaved samples
    pub fn from_interleaved(
        name: impl Into<String>,
        sample_rate: u32,
        channel_count: usize,
        samples: &[f32],
    ) -> Self {
        let channel_count = channel_count.max(1);
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::from_channels(name, sample_rate, channels)
    }

    /// Re-chunk storage into blocks of `block_size` samples
    pub fn with_block_size(self, block_size: usize) -> Self {
        let channels = (0..self.channels.len())
            .map(|ch| self.channel_samples(ch))
            .collect();
        let mut track = Self::with_block_size_from(self.name, self.sample_rate, channels, block_size);
        track.start_sample = self.start_sample;
        track
    }

    /// Place the first sample at `start_sample` on the timeline
    pub fn with_start_sample(mut self, start_sample: u64) -> Self {
        self.start_sample = start_sample;
        self
    }

    fn with_block_size_from(
        name: String,
        sample_rate: u32,
        channels: Vec<Vec<f32>>,
        block_size: usize,
    ) -> Self {
        let block_size = block_size.max(1);
        let len = channels.iter().map(Vec::len).max().unwrap_or(0);

        let channels = channels
            .into_iter()
            .map(|mut samples| {
                samples.resize(len, 0.0);
                samples
                    .chunks(block_size)
                    .map(|chunk| Arc::new(chunk.to_vec()))
                    .collect()
            })
            .collect();

        Self {
            name,
            sample_rate,
            start_sample: 0,
            block_size,
            len: len as u64,
            channels,
        }
    }

    /// Number of samples per channel
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// First sample position on the timeline
    pub fn start_sample(&self) -> u64 {
        self.start_sample
    }

    /// Copy one channel out as a contiguous vector
    pub fn channel_samples(&self, channel: usize) -> Vec<f32> {
        self.channels
            .get(channel)
            .map(|blocks| blocks.iter().flat_map(|b| b.iter().copied()).collect())
            .unwrap_or_default()
    }

    /// Interleave all channels (for writing files)
    pub fn interleaved(&self) -> Vec<f32> {
        let planar: Vec<Vec<f32>> = (0..self.channels.len())
            .map(|ch| self.channel_samples(ch))
            .collect();
        let mut out = Vec::with_capacity(planar.len() * self.len as usize);
        for i in 0..self.len as usize {
            for channel in &planar {
                out.push(channel[i]);
            }
        }
        out
    }

    fn check_channel(&self, channel: usize) -> Result<()> {
        if channel < self.channels.len() {
            Ok(())
        } else {
            Err(GainstageError::ChannelOutOfRange {
                channel,
                channels: self.channels.len(),
            })
        }
    }

    /// Intersection of `[position, position + count)` with the track, as
    /// offsets relative to the track start
    fn overlap(&self, position: u64, count: usize) -> Option<(u64, u64)> {
        let end = self.start_sample + self.len;
        let from = position.max(self.start_sample);
        let to = (position + count as u64).min(end);
        if to > from {
            Some((from - self.start_sample, to - self.start_sample))
        } else {
            None
        }
    }
}

impl Track for MemoryTrack {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn start_time(&self) -> f64 {
        self.start_sample as f64 / f64::from(self.sample_rate)
    }

    fn end_time(&self) -> f64 {
        (self.start_sample + self.len) as f64 / f64::from(self.sample_rate)
    }

    fn best_block_size(&self, position: u64) -> usize {
        if position < self.start_sample || position >= self.start_sample + self.len {
            return self.block_size;
        }
        let offset = (position - self.start_sample) as usize;
        self.block_size - offset % self.block_size
    }

    fn max_block_size(&self) -> usize {
        self.block_size
    }

    fn read(&self, channel: usize, position: u64, out: &mut [f32]) -> Result<usize> {
        self.check_channel(channel)?;
        out.fill(0.0);

        let Some((from, to)) = self.overlap(position, out.len()) else {
            return Ok(0);
        };

        let blocks = &self.channels[channel];
        let mut offset = from;
        while offset < to {
            let block = (offset / self.block_size as u64) as usize;
            let within = (offset % self.block_size as u64) as usize;
            let take = ((to - offset) as usize).min(self.block_size - within);
            let dest = (offset + self.start_sample - position) as usize;
            out[dest..dest + take].copy_from_slice(&blocks[block][within..within + take]);
            offset += take as u64;
        }

        Ok((to - from) as usize)
    }

    fn write(&mut self, channel: usize, position: u64, samples: &[f32]) -> Result<()> {
        self.check_channel(channel)?;

        let Some((from, to)) = self.overlap(position, samples.len()) else {
            return Ok(());
        };

        let start_sample = self.start_sample;
        let block_size = self.block_size;
        let blocks = &mut self.channels[channel];
        let mut offset = from;
        while offset < to {
            let block = (offset / block_size as u64) as usize;
            let within = (offset % block_size as u64) as usize;
            let take = ((to - offset) as usize).min(block_size - within);
            let src = (offset + start_sample - position) as usize;
            Arc::make_mut(&mut blocks[block])[within..within + take]
                .copy_from_slice(&samples[src..src + take]);
            offset += take as u64;
        }

        Ok(())
    }
}
