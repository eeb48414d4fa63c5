//! Reusable per-channel block buffer
//!
//! Sized once to the largest block any selected track hands out and reused
//! for every block of every track, so a run over hours of audio allocates
//! exactly once.

use crate::blocks::Block;
use crate::error::{LoudnessError, Result};
use gainstage_core::{ChannelGroup, Track};

/// Fixed-capacity planar sample buffer
#[derive(Debug)]
pub struct SampleBuffer {
    slots: Vec<Vec<f32>>,
    capacity: usize,
    /// Valid samples per channel after the last load
    len: usize,
    /// Channels filled by the last load
    channels: usize,
}

impl SampleBuffer {
    /// Allocate `slot_count` channel slots of `capacity` samples each
    pub fn new(slot_count: usize, capacity: usize) -> Self {
        let slot_count = slot_count.max(1);
        let capacity = capacity.max(1);
        Self {
            slots: vec![vec![0.0; capacity]; slot_count],
            capacity,
            len: 0,
            channels: 0,
        }
    }

    /// Allocate a buffer able to hold any block of any of `tracks`
    ///
    /// Capacity is the largest `max_block_size` among the tracks. Linked
    /// processing needs a slot per channel of the widest track; independent
    /// processing needs one.
    pub fn for_tracks<T: Track>(tracks: &[T], linked: bool) -> Self {
        let capacity = tracks.iter().map(Track::max_block_size).max().unwrap_or(1);
        let slot_count = if linked {
            tracks.iter().map(Track::channel_count).max().unwrap_or(1)
        } else {
            1
        };
        Self::new(slot_count, capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Valid samples per channel after the last load
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Channels filled by the last load
    pub fn channel_count(&self) -> usize {
        self.channels
    }

    /// Valid samples of one loaded channel
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.slots[index][..self.len]
    }

    /// Valid samples of every loaded channel, in group order
    pub fn channels(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.slots[..self.channels].iter().map(|slot| &slot[..self.len])
    }

    /// Read one block of every channel in `group`
    ///
    /// The first channel's in-track sample count is the expected count for
    /// the whole group; any other channel reporting a different count is a
    /// [`LoudnessError::DataIntegrity`] error. Returns the expected count.
    pub fn load<T: Track + ?Sized>(
        &mut self,
        track: &T,
        group: &ChannelGroup,
        block: Block,
    ) -> Result<usize> {
        self.check_fits(group, block)?;

        let mut expected: Option<usize> = None;
        for (slot, &channel) in self.slots.iter_mut().zip(group.channels()) {
            let read = track.read(channel, block.position, &mut slot[..block.len])?;
            match expected {
                None => expected = Some(read),
                Some(count) if count != read => {
                    return Err(LoudnessError::DataIntegrity {
                        track: track.name().to_string(),
                        channel,
                        position: block.position,
                        expected: count,
                        actual: read,
                    });
                }
                Some(_) => {}
            }
        }

        self.len = expected.unwrap_or(0);
        self.channels = group.len();
        Ok(self.len)
    }

    /// Write one block of every channel in `group` back to the track
    pub fn store<T: Track + ?Sized>(
        &self,
        track: &mut T,
        group: &ChannelGroup,
        block: Block,
    ) -> Result<()> {
        self.check_fits(group, block)?;

        for (slot, &channel) in self.slots.iter().zip(group.channels()) {
            track.write(channel, block.position, &slot[..block.len])?;
        }
        Ok(())
    }

    /// Multiply every valid sample of every loaded channel by `factor`
    pub fn scale(&mut self, factor: f32) {
        let len = self.len;
        for slot in &mut self.slots[..self.channels] {
            for sample in &mut slot[..len] {
                *sample *= factor;
            }
        }
    }

    fn check_fits(&self, group: &ChannelGroup, block: Block) -> Result<()> {
        if group.is_empty() || group.len() > self.slots.len() {
            return Err(LoudnessError::InvalidChannelCount(group.len()));
        }
        if block.len > self.capacity {
            return Err(LoudnessError::BlockTooLarge {
                len: block.len,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}
