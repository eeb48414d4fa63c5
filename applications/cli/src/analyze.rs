//! Level report for a whole track

use crate::error::{CliError, Result};
use gainstage_core::{ChannelGroup, Selection, Track};
use gainstage_loudness::{linear_to_db, Blocks, LevelAnalyzer, NormalizeTarget, SampleBuffer};
use serde::Serialize;
use std::fmt;

/// Levels measured over every channel of a track
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackLevels {
    /// Integrated loudness (LUFS); negative infinity for silence
    pub loudness_lufs: f64,
    /// RMS over all channels (dBFS)
    pub rms_db: f64,
    /// Sample peak (dBFS)
    pub peak_db: f64,
}

impl fmt::Display for TrackLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Integrated: {:.1} LUFS, RMS: {:.1} dB, Peak: {:.1} dB",
            self.loudness_lufs, self.rms_db, self.peak_db
        )
    }
}

/// Measure loudness, RMS and peak of a track, block by block
pub fn analyze_track<T: Track + ?Sized>(track: &T, dual_mono: bool) -> Result<TrackLevels> {
    let range = Selection::whole()
        .clip(track)
        .ok_or_else(|| CliError::EmptyInput(track.name().to_string()))?;

    let group = ChannelGroup::linked(track.channel_count());
    let rate = track.sample_rate();
    let mut loudness = LevelAnalyzer::new(NormalizeTarget::Loudness, group.len(), rate, dual_mono)?;
    let mut rms = LevelAnalyzer::new(NormalizeTarget::Rms, group.len(), rate, false)?;
    let mut buffer = SampleBuffer::new(group.len(), track.max_block_size());
    let mut peak = 0.0_f32;

    for block in Blocks::new(track, range, buffer.capacity()) {
        buffer.load(track, &group, block)?;
        loudness.add_buffer(&buffer)?;
        rms.add_buffer(&buffer)?;
        peak = buffer
            .channels()
            .flatten()
            .fold(peak, |peak, &sample| peak.max(sample.abs()));
    }

    Ok(TrackLevels {
        loudness_lufs: loudness.measured_db()?,
        rms_db: rms.measured_db()?,
        peak_db: if peak > 0.0 {
            linear_to_db(f64::from(peak))
        } else {
            f64::NEG_INFINITY
        },
    })
}
