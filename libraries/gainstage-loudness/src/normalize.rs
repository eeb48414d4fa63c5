//! Loudness / RMS normalization effect
//!
//! Measures each channel group with [`LevelAnalyzer`] and corrects it to the
//! configured level with [`LevelCalculator`].

use crate::analysis::LevelAnalyzer;
use crate::buffer::SampleBuffer;
use crate::error::{LoudnessError, Result};
use crate::level::LevelCalculator;
use crate::processor::{ProcessReport, TwoPassEffect, TwoPassProcessor};
use crate::settings::LoudnessSettings;
use gainstage_core::{ChannelGroup, ProgressReporter, Selection, Track};
use tracing::debug;

/// Progress message header shown during both passes
pub const DESCRIPTION: &str = "Normalizing Loudness...";

/// Two-pass normalize effect
pub struct LoudnessNormalizer {
    settings: LoudnessSettings,
    calculator: LevelCalculator,
    analyzer: Option<LevelAnalyzer>,
    /// Level measured in the last finished analysis
    last_measurement: Option<f64>,
}

impl LoudnessNormalizer {
    /// Levels outside the accepted range are clamped by the calculator
    pub fn new(settings: LoudnessSettings) -> Self {
        Self {
            calculator: LevelCalculator::new(settings.normalize_to, settings.active_level_db()),
            settings,
            analyzer: None,
            last_measurement: None,
        }
    }

    pub fn settings(&self) -> &LoudnessSettings {
        &self.settings
    }

    /// Level measured by the last finished analysis, in the target's unit
    pub fn last_measurement(&self) -> Option<f64> {
        self.last_measurement
    }
}

impl TwoPassEffect for LoudnessNormalizer {
    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn independent(&self) -> bool {
        self.settings.stereo_independent
    }

    fn begin_group(&mut self, group: &ChannelGroup, sample_rate: u32) -> Result<()> {
        self.analyzer = Some(LevelAnalyzer::new(
            self.settings.normalize_to,
            group.len(),
            sample_rate,
            self.settings.dual_mono_applies(),
        )?);
        Ok(())
    }

    fn analyse_block(&mut self, buffer: &SampleBuffer) -> Result<()> {
        match &mut self.analyzer {
            Some(analyzer) => analyzer.add_buffer(buffer),
            None => Err(LoudnessError::Analysis(
                "Block analysed before group start".to_string(),
            )),
        }
    }

    fn finish_analysis(&mut self) -> Result<f64> {
        let analyzer = self.analyzer.take().ok_or_else(|| {
            LoudnessError::Analysis("Analysis finished before group start".to_string())
        })?;

        let measured = analyzer.measured_db()?;
        let factor = self.calculator.correction(analyzer.extent()?);
        debug!(
            target = analyzer.target().as_str(),
            measured,
            level = self.calculator.level_db(),
            frames = analyzer.frames(),
            factor,
            "Correction derived"
        );

        self.last_measurement = Some(measured);
        Ok(factor)
    }
}

/// Normalize `tracks` within `selection` using `settings`
///
/// # Example
///
/// ```rust
/// use gainstage_core::{MemoryTrack, NoProgress, Selection};
/// use gainstage_loudness::{normalize_tracks, LoudnessSettings, NormalizeTarget};
///
/// let mut tracks = vec![MemoryTrack::from_channels("tone", 8000, vec![vec![0.5; 8000]])];
/// let settings = LoudnessSettings {
///     normalize_to: NormalizeTarget::Rms,
///     rms_level: -12.0,
///     ..LoudnessSettings::default()
/// };
///
/// let report = normalize_tracks(&settings, &mut tracks, Selection::whole(), &mut NoProgress)?;
/// assert_eq!(report.processed(), 1);
/// # Ok::<(), gainstage_loudness::LoudnessError>(())
/// ```
pub fn normalize_tracks<T: Track + Clone>(
    settings: &LoudnessSettings,
    tracks: &mut [T],
    selection: Selection,
    progress: &mut dyn ProgressReporter,
) -> Result<ProcessReport> {
    let mut processor = TwoPassProcessor::new(LoudnessNormalizer::new(*settings));
    processor.process(tracks, selection, progress)
}
