//! Analysis pass accumulator
//!
//! Collects the statistic the correction is derived from while blocks stream
//! past:
//! - Loudness target: EBU R128 integrated loudness via the ebur128 crate
//!   (K-weighted, gated mean power)
//! - RMS target: running sum of squares over every channel of the group

use crate::buffer::SampleBuffer;
use crate::error::{LoudnessError, Result};
use crate::level::{linear_to_db, LevelCalculator, NormalizeTarget};
use ebur128::{Channel, EbuR128, Mode};

/// Most channels one group may hold
pub const MAX_CHANNELS: usize = 8;

enum Accumulator {
    Loudness(Box<EbuR128>),
    Rms { sum_squares: f64 },
}

/// Measures one channel group during the analysis pass
///
/// # Example
///
/// ```ignore
/// use gainstage_loudness::{LevelAnalyzer, NormalizeTarget};
///
/// let mut analyzer = LevelAnalyzer::new(NormalizeTarget::Rms, 2, 44100, false)?;
/// analyzer.add_planar(&[&left, &right])?;
/// println!("RMS: {:.1} dB", analyzer.measured_db()?);
/// ```
pub struct LevelAnalyzer {
    target: NormalizeTarget,
    channels: usize,
    sample_rate: u32,
    /// Samples per channel seen so far
    frames: u64,
    accumulator: Accumulator,
}

impl LevelAnalyzer {
    /// Create an analyzer for one group
    ///
    /// # Arguments
    /// * `target` - Statistic to accumulate
    /// * `channels` - Channels in the group (1-8)
    /// * `sample_rate` - Sample rate in Hz (8000-384000)
    /// * `dual_mono` - Weight a single loudness channel as dual mono (+3 dB)
    pub fn new(
        target: NormalizeTarget,
        channels: usize,
        sample_rate: u32,
        dual_mono: bool,
    ) -> Result<Self> {
        if !(8000..=384000).contains(&sample_rate) {
            return Err(LoudnessError::InvalidSampleRate(sample_rate));
        }
        if !(1..=MAX_CHANNELS).contains(&channels) {
            return Err(LoudnessError::InvalidChannelCount(channels));
        }

        let accumulator = match target {
            NormalizeTarget::Loudness => {
                let mut ebur128 = EbuR128::new(channels as u32, sample_rate, Mode::I)?;
                if dual_mono && channels == 1 {
                    ebur128.set_channel(0, Channel::DualMono)?;
                }
                Accumulator::Loudness(Box::new(ebur128))
            }
            NormalizeTarget::Rms => Accumulator::Rms { sum_squares: 0.0 },
        };

        Ok(Self {
            target,
            channels,
            sample_rate,
            frames: 0,
            accumulator,
        })
    }

    pub fn target(&self) -> NormalizeTarget {
        self.target
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel analysed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Feed the valid samples of a freshly loaded buffer
    pub fn add_buffer(&mut self, buffer: &SampleBuffer) -> Result<()> {
        let mut planes: [&[f32]; MAX_CHANNELS] = [&[]; MAX_CHANNELS];
        let mut count = 0;
        for (plane, channel) in planes.iter_mut().zip(buffer.channels()) {
            *plane = channel;
            count += 1;
        }
        self.add_planar(&planes[..count])
    }

    /// Feed planar samples; every plane must have the same length
    pub fn add_planar(&mut self, planes: &[&[f32]]) -> Result<()> {
        if planes.len() != self.channels {
            return Err(LoudnessError::InvalidChannelCount(planes.len()));
        }
        let frames = planes.first().map_or(0, |p| p.len());
        if frames == 0 {
            return Ok(());
        }
        if planes.iter().any(|p| p.len() != frames) {
            return Err(LoudnessError::Analysis(
                "Planes of one block differ in length".to_string(),
            ));
        }

        match &mut self.accumulator {
            Accumulator::Loudness(ebur128) => ebur128.add_frames_planar_f32(planes)?,
            Accumulator::Rms { sum_squares } => {
                for plane in planes {
                    *sum_squares += plane
                        .iter()
                        .map(|&s| f64::from(s) * f64::from(s))
                        .sum::<f64>();
                }
            }
        }

        self.frames += frames as u64;
        Ok(())
    }

    /// Linear extent handed to [`LevelCalculator::correction`]
    ///
    /// Loudness: mean gated power. RMS: root-mean-square amplitude over all
    /// channels. Silence (or too little audio to gate) gives 0.
    pub fn extent(&self) -> Result<f64> {
        match &self.accumulator {
            Accumulator::Loudness(ebur128) => {
                let lufs = ebur128.loudness_global()?;
                if lufs.is_finite() {
                    Ok(LevelCalculator::loudness_extent(lufs))
                } else {
                    Ok(0.0)
                }
            }
            Accumulator::Rms { sum_squares } => {
                let samples = self.frames as f64 * self.channels as f64;
                if samples == 0.0 {
                    Ok(0.0)
                } else {
                    Ok((sum_squares / samples).sqrt())
                }
            }
        }
    }

    /// Measured level in the target's unit (LUFS or dBFS)
    ///
    /// Returns negative infinity for silence.
    pub fn measured_db(&self) -> Result<f64> {
        match &self.accumulator {
            Accumulator::Loudness(ebur128) => Ok(ebur128.loudness_global()?),
            Accumulator::Rms { .. } => {
                let rms = self.extent()?;
                Ok(if rms > 0.0 {
                    linear_to_db(rms)
                } else {
                    f64::NEG_INFINITY
                })
            }
        }
    }
}
