//! Target level to correction factor
//!
//! Turns a requested level and the extent measured by the analysis pass into
//! the single linear factor the apply pass multiplies every sample by.
//!
//! # Units
//!
//! LUFS are defined as `10·log10(power)` while dBFS amplitudes use
//! `20·log10(amplitude)`. A LUFS level is therefore doubled before going
//! through the amplitude conversion, which yields a power ratio. The
//! loudness extent is a power too, so the quotient is a power gain and the
//! sample factor is its square root. RMS targets stay in the amplitude
//! domain throughout.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Lowest accepted target level in dB (LUFS or dBFS RMS)
pub const MIN_LEVEL_DB: f64 = -145.0;

/// Highest accepted target level in dB (LUFS or dBFS RMS)
pub const MAX_LEVEL_DB: f64 = 0.0;

/// What the normalization measures and targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeTarget {
    /// Perceived loudness (EBU R128 integrated loudness, LUFS)
    #[default]
    Loudness,
    /// Root-mean-square level (dBFS)
    Rms,
}

impl NormalizeTarget {
    /// Index stored in parameter maps (`NormalizeTo`)
    pub fn index(self) -> i64 {
        match self {
            Self::Loudness => 0,
            Self::Rms => 1,
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Loudness),
            1 => Some(Self::Rms),
            _ => None,
        }
    }

    /// Parse from string (for command lines and config files)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "loudness" | "lufs" | "perceived" => Some(Self::Loudness),
            "rms" => Some(Self::Rms),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loudness => "loudness",
            Self::Rms => "rms",
        }
    }

    /// Unit label of the target level
    pub fn unit(self) -> &'static str {
        match self {
            Self::Loudness => "LUFS",
            Self::Rms => "dB",
        }
    }
}

/// Convert decibels to a linear amplitude ratio
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert a linear amplitude ratio to decibels
pub fn linear_to_db(linear: f64) -> f64 {
    20.0 * linear.log10()
}

/// Computes correction factors for one target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCalculator {
    target: NormalizeTarget,
    level_db: f64,
}

impl LevelCalculator {
    /// Create a calculator; `level_db` is clamped to
    /// [`MIN_LEVEL_DB`]..=[`MAX_LEVEL_DB`]
    ///
    /// The clamp applies to the level before loudness doubles it, so LUFS
    /// targets below -72.5 are honoured rather than floored at -72.5.
    pub fn new(target: NormalizeTarget, level_db: f64) -> Self {
        Self {
            target,
            level_db: level_db.clamp(MIN_LEVEL_DB, MAX_LEVEL_DB),
        }
    }

    pub fn target(&self) -> NormalizeTarget {
        self.target
    }

    /// Target level after clamping
    pub fn level_db(&self) -> f64 {
        self.level_db
    }

    /// Target expressed in the linear domain of the measured extent
    pub fn target_ratio(&self) -> f64 {
        match self.target {
            NormalizeTarget::Loudness => db_to_linear(self.level_db * 2.0),
            NormalizeTarget::Rms => db_to_linear(self.level_db),
        }
    }

    /// Linear extent of a measured integrated loudness
    pub fn loudness_extent(lufs: f64) -> f64 {
        db_to_linear(lufs * 2.0)
    }

    /// Sample multiplier bringing `extent` to the target
    ///
    /// An extent that is zero, negative or not finite (silence, or audio too
    /// short to measure) gives 1.0 so the track is left as it is.
    pub fn correction(&self, extent: f64) -> f64 {
        if !(extent.is_finite() && extent > 0.0) {
            warn!(extent, "Measured extent unusable, leaving level unchanged");
            return 1.0;
        }

        let ratio = self.target_ratio() / extent;
        match self.target {
            NormalizeTarget::Loudness => ratio.sqrt(),
            NormalizeTarget::Rms => ratio,
        }
    }
}

/// One-shot form of [`LevelCalculator::correction`]
pub fn compute_correction(target: NormalizeTarget, level_db: f64, extent: f64) -> f64 {
    LevelCalculator::new(target, level_db).correction(extent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_correction_reaches_target() {
        // Constant 0.5 has RMS 0.5 (-6.02 dBFS); target -12 dBFS
        let factor = compute_correction(NormalizeTarget::Rms, -12.0, 0.5);
        let corrected = 0.5 * factor;
        assert!((linear_to_db(corrected) - (-12.0)).abs() < 1e-9);
    }

    #[test]
    fn quiet_loudness_targets_clamp_before_doubling() {
        let calculator = LevelCalculator::new(NormalizeTarget::Loudness, -100.0);
        assert_eq!(calculator.level_db(), -100.0);
        assert!((linear_to_db(calculator.target_ratio()) - (-200.0)).abs() < 1e-9);

        let floor = LevelCalculator::new(NormalizeTarget::Loudness, -500.0);
        assert_eq!(floor.level_db(), MIN_LEVEL_DB);
    }

    #[test]
    fn loudness_correction_shifts_by_level_difference() {
        // Measured -30 LUFS, target -23 LUFS: +7 dB of amplitude gain
        let extent = LevelCalculator::loudness_extent(-30.0);
        let factor = compute_correction(NormalizeTarget::Loudness, -23.0, extent);
        assert!((linear_to_db(factor) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn loudness_ratio_uses_doubled_level() {
        let calc = LevelCalculator::new(NormalizeTarget::Loudness, -10.0);
        assert!((calc.target_ratio() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn level_above_zero_clamps_to_zero() {
        for target in [NormalizeTarget::Loudness, NormalizeTarget::Rms] {
            let high = compute_correction(target, 6.0, 0.25);
            let zero = compute_correction(target, 0.0, 0.25);
            assert_eq!(high, zero);
        }
    }

    #[test]
    fn level_below_minimum_clamps() {
        let calc = LevelCalculator::new(NormalizeTarget::Rms, -500.0);
        assert_eq!(calc.level_db(), MIN_LEVEL_DB);
    }

    #[test]
    fn unusable_extent_leaves_level_alone() {
        assert_eq!(compute_correction(NormalizeTarget::Rms, -20.0, 0.0), 1.0);
        assert_eq!(compute_correction(NormalizeTarget::Loudness, -20.0, f64::NAN), 1.0);
        assert_eq!(
            compute_correction(NormalizeTarget::Loudness, -20.0, f64::INFINITY),
            1.0
        );
    }

    #[test]
    fn target_parsing() {
        assert_eq!(NormalizeTarget::from_str("LUFS"), Some(NormalizeTarget::Loudness));
        assert_eq!(NormalizeTarget::from_str("rms"), Some(NormalizeTarget::Rms));
        assert_eq!(NormalizeTarget::from_str("peak"), None);
        assert_eq!(NormalizeTarget::from_index(1), Some(NormalizeTarget::Rms));
        assert_eq!(NormalizeTarget::from_index(2), None);
    }
}
