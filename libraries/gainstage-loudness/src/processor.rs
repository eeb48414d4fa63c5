//! Two-pass block-streamed track processing
//!
//! Drives a [`TwoPassEffect`] over every selected track: an analysis pass
//! reads each channel group block by block and lets the effect accumulate
//! statistics, then an apply pass scales every block by the correction the
//! effect derived and writes it back.
//!
//! Tracks are processed as working copies. The caller's tracks are replaced
//! only when every selected track succeeded; an error or cancellation on
//! any of them leaves all of them untouched.

use crate::blocks::BlockCursor;
use crate::buffer::SampleBuffer;
use crate::error::{LoudnessError, Result};
use gainstage_core::{ChannelGroup, ProgressReporter, SampleRange, Selection, Track};
use tracing::{debug, info, warn};

/// Effect plugged into [`TwoPassProcessor`]
///
/// The processor owns block iteration, buffering, progress and the apply
/// pass. The effect only measures and decides on a factor.
pub trait TwoPassEffect {
    /// First line of every progress message
    fn description(&self) -> &str;

    /// Whether each channel is measured and corrected on its own
    fn independent(&self) -> bool;

    /// Reset accumulated statistics before a group's analysis pass
    fn begin_group(&mut self, group: &ChannelGroup, sample_rate: u32) -> Result<()>;

    /// Accumulate one loaded block
    fn analyse_block(&mut self, buffer: &SampleBuffer) -> Result<()>;

    /// Correction factor for the group just analysed
    fn finish_analysis(&mut self) -> Result<f64>;
}

/// What happened to one track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    /// Processed; one correction factor per channel group
    Success { corrections: Vec<f64> },
    /// Nothing of the track lies inside the selection
    Skipped,
}

/// Outcome of one track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackReport {
    pub name: String,
    pub outcome: TrackOutcome,
}

/// Outcome of a whole run, in track order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessReport {
    pub tracks: Vec<TrackReport>,
}

impl ProcessReport {
    /// Number of tracks actually processed
    pub fn processed(&self) -> usize {
        self.tracks
            .iter()
            .filter(|t| matches!(t.outcome, TrackOutcome::Success { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.tracks.len() - self.processed()
    }
}

/// Monotone progress over both passes of every processed channel
struct PassProgress<'p> {
    reporter: &'p mut dyn ProgressReporter,
    fraction: f64,
    total_channels: usize,
}

impl PassProgress<'_> {
    /// Advance by one block and ask the host whether to continue
    fn advance(
        &mut self,
        channels: usize,
        block_len: usize,
        range_len: u64,
        message: &str,
        track: &str,
    ) -> Result<()> {
        let denominator = self.total_channels as f64 * 2.0 * range_len as f64;
        if denominator > 0.0 {
            let step = (channels * block_len) as f64 / denominator;
            self.fraction = (self.fraction + step).clamp(0.0, 1.0);
        }

        if self.reporter.update(self.fraction, message) {
            Ok(())
        } else {
            warn!(track, fraction = self.fraction, "Normalization cancelled");
            Err(LoudnessError::Cancelled {
                track: track.to_string(),
            })
        }
    }
}

/// Runs a [`TwoPassEffect`] over a set of tracks
pub struct TwoPassProcessor<E> {
    effect: E,
}

impl<E: TwoPassEffect> TwoPassProcessor<E> {
    pub fn new(effect: E) -> Self {
        Self { effect }
    }

    pub fn effect(&self) -> &E {
        &self.effect
    }

    pub fn effect_mut(&mut self) -> &mut E {
        &mut self.effect
    }

    pub fn into_inner(self) -> E {
        self.effect
    }

    /// Process every track within `selection`
    ///
    /// Tracks with no samples inside the selection are reported as
    /// [`TrackOutcome::Skipped`]. On error the slice is left unchanged.
    pub fn process<T: Track + Clone>(
        &mut self,
        tracks: &mut [T],
        selection: Selection,
        progress: &mut dyn ProgressReporter,
    ) -> Result<ProcessReport> {
        let independent = self.effect.independent();
        let ranges: Vec<Option<SampleRange>> =
            tracks.iter().map(|track| selection.clip(track)).collect();

        let total_channels: usize = tracks
            .iter()
            .zip(&ranges)
            .filter(|(_, range)| range.is_some())
            .map(|(track, _)| track.channel_count())
            .sum();

        let mut buffer = SampleBuffer::for_tracks(tracks, !independent);
        let mut progress = PassProgress {
            reporter: progress,
            fraction: 0.0,
            total_channels,
        };

        info!(
            tracks = tracks.len(),
            channels = total_channels,
            independent,
            capacity = buffer.capacity(),
            "Starting two-pass processing"
        );

        let mut report = ProcessReport::default();
        let mut working = Vec::new();

        for (index, (track, range)) in tracks.iter().zip(&ranges).enumerate() {
            let Some(range) = *range else {
                warn!(track = track.name(), "No samples in selection, skipping track");
                report.tracks.push(TrackReport {
                    name: track.name().to_string(),
                    outcome: TrackOutcome::Skipped,
                });
                continue;
            };

            let mut copy = track.clone();
            let mut corrections = Vec::new();
            for group in ChannelGroup::for_track(&copy, independent) {
                let factor =
                    self.process_group(&mut copy, &group, range, &mut buffer, &mut progress)?;
                corrections.push(factor);
            }

            report.tracks.push(TrackReport {
                name: track.name().to_string(),
                outcome: TrackOutcome::Success { corrections },
            });
            working.push((index, copy));
        }

        if total_channels > 0 {
            // Completion is reported even if rounding left the sum short of 1
            if !progress.reporter.update(1.0, self.effect.description()) {
                let track = report
                    .tracks
                    .last()
                    .map(|last| last.name.clone())
                    .unwrap_or_default();
                warn!(track = %track, "Normalization cancelled at completion");
                return Err(LoudnessError::Cancelled { track });
            }
        }

        for (index, copy) in working {
            tracks[index] = copy;
        }

        info!(
            processed = report.processed(),
            skipped = report.skipped(),
            "Two-pass processing complete"
        );
        Ok(report)
    }

    /// Analyse then correct one channel group of a working copy
    ///
    /// Returns the correction factor applied.
    fn process_group<T: Track + ?Sized>(
        &mut self,
        track: &mut T,
        group: &ChannelGroup,
        range: SampleRange,
        buffer: &mut SampleBuffer,
        progress: &mut PassProgress<'_>,
    ) -> Result<f64> {
        let name = track.name().to_string();
        if range.is_empty() {
            return Err(LoudnessError::EmptyRange { track: name });
        }

        // Analysis pass
        let message = format!("{}\nAnalyzing: {}", self.effect.description(), name);
        self.effect.begin_group(group, track.sample_rate())?;
        let mut cursor = BlockCursor::new(range, buffer.capacity());
        while let Some(block) = cursor.next_block(&*track) {
            buffer.load(&*track, group, block)?;
            self.effect.analyse_block(buffer)?;
            progress.advance(group.len(), block.len, range.len(), &message, &name)?;
        }

        let factor = self.effect.finish_analysis()?;
        info!(
            track = %name,
            channels = ?group.channels(),
            start = range.start,
            end = range.end,
            factor,
            "Analysis complete"
        );

        // Apply pass
        let message = format!("{}\nProcessing: {}", self.effect.description(), name);
        let gain = factor as f32;
        let mut cursor = BlockCursor::new(range, buffer.capacity());
        let mut blocks = 0usize;
        while let Some(block) = cursor.next_block(&*track) {
            buffer.load(&*track, group, block)?;
            buffer.scale(gain);
            buffer.store(track, group, block)?;
            progress.advance(group.len(), block.len, range.len(), &message, &name)?;
            blocks += 1;
        }

        debug!(track = %name, blocks, "Apply pass complete");
        Ok(factor)
    }
}
