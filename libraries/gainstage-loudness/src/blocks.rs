//! Block iteration over a sample range
//!
//! Splits a range into consecutive blocks no longer than the track's natural
//! block size at each position and the buffer capacity. The cursor does not
//! borrow the track, so the same loop can read and write it.

use gainstage_core::{SampleRange, Track};

/// One contiguous run of samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Absolute position of the first sample
    pub position: u64,
    /// Number of samples
    pub len: usize,
}

/// Lazy, non-restartable walk over a [`SampleRange`]
#[derive(Debug, Clone)]
pub struct BlockCursor {
    cursor: u64,
    end: u64,
    capacity: usize,
}

impl BlockCursor {
    /// # Arguments
    /// * `range` - Samples to cover; an empty range yields no blocks
    /// * `capacity` - Upper bound on every block length (at least 1)
    pub fn new(range: SampleRange, capacity: usize) -> Self {
        Self {
            cursor: range.start,
            end: range.end.max(range.start),
            capacity: capacity.max(1),
        }
    }

    /// Next block, sized by the track's natural block size at the cursor
    pub fn next_block<T: Track + ?Sized>(&mut self, track: &T) -> Option<Block> {
        if self.cursor >= self.end {
            return None;
        }

        let natural = match track.best_block_size(self.cursor) {
            0 => self.capacity,
            n => n,
        };
        let remaining = self.end - self.cursor;
        let len = natural
            .min(self.capacity)
            .min(usize::try_from(remaining).unwrap_or(usize::MAX));

        let block = Block {
            position: self.cursor,
            len,
        };
        self.cursor += len as u64;
        Some(block)
    }

    /// Samples not yet handed out
    pub fn remaining(&self) -> u64 {
        self.end - self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.end
    }
}

/// [`Iterator`] over the blocks of a range of a borrowed track
pub struct Blocks<'a, T: Track + ?Sized> {
    cursor: BlockCursor,
    track: &'a T,
}

impl<'a, T: Track + ?Sized> Blocks<'a, T> {
    pub fn new(track: &'a T, range: SampleRange, capacity: usize) -> Self {
        Self {
            cursor: BlockCursor::new(range, capacity),
            track,
        }
    }
}

impl<T: Track + ?Sized> Iterator for Blocks<'_, T> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        self.cursor.next_block(self.track)
    }
}
