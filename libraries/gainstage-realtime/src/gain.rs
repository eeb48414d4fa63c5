//! Live gain stage
//!
//! Applies a fixed linear factor to a live stream, the realtime counterpart
//! of the apply pass. One processor per channel. The gain lives in an
//! `AtomicU32` holding `f32` bits so a control thread can retune it while
//! the audio thread runs.

use crate::effect::RealtimeEffect;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Default samples per `realtime_process` call
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Shared, lock-free gain effect
#[derive(Debug)]
pub struct RealtimeGain {
    /// Linear gain as `f32` bits
    gain: AtomicU32,
    block_size: usize,
    processors: AtomicUsize,
}

impl RealtimeGain {
    /// Create a gain stage from a linear factor
    pub fn new(gain: f32) -> Self {
        Self {
            gain: AtomicU32::new(sanitize(gain).to_bits()),
            block_size: DEFAULT_BLOCK_SIZE,
            processors: AtomicUsize::new(0),
        }
    }

    /// Create a gain stage from decibels
    pub fn from_db(db: f32) -> Self {
        Self::new(10.0_f32.powf(db / 20.0))
    }

    /// Limit samples per processing call (at least 1)
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Current linear gain
    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    /// Set linear gain; negative or non-finite values become 0
    pub fn set_gain(&self, gain: f32) {
        self.gain.store(sanitize(gain).to_bits(), Ordering::Relaxed);
    }

    pub fn set_gain_db(&self, db: f32) {
        self.set_gain(10.0_f32.powf(db / 20.0));
    }

    pub fn gain_db(&self) -> f32 {
        20.0 * self.gain().log10()
    }

    /// Processors added so far
    pub fn processor_count(&self) -> usize {
        self.processors.load(Ordering::Acquire)
    }
}

impl Default for RealtimeGain {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn sanitize(gain: f32) -> f32 {
    if gain.is_finite() && gain > 0.0 {
        gain
    } else {
        0.0
    }
}

impl RealtimeEffect for RealtimeGain {
    fn name(&self) -> &str {
        "gain"
    }

    fn audio_in_count(&self) -> usize {
        1
    }

    fn audio_out_count(&self) -> usize {
        1
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn realtime_add_processor(&self, _channels: usize, _sample_rate: f32) -> bool {
        self.processors.fetch_add(1, Ordering::AcqRel);
        true
    }

    fn realtime_process(
        &self,
        _processor: usize,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        len: usize,
    ) -> usize {
        let gain = self.gain();
        let (Some(input), Some(output)) = (inputs.first(), outputs.first_mut()) else {
            return 0;
        };
        let len = len.min(input.len()).min(output.len());
        for (out, &sample) in output[..len].iter_mut().zip(&input[..len]) {
            *out = sample * gain;
        }
        len
    }
}
