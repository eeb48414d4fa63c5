//! Loudness effect settings
//!
//! The five user-facing parameters, their documented ranges, change
//! notification for whatever presents them, and the one-shot migration of
//! settings saved under the legacy preference group.

use crate::error::Result;
use crate::level::NormalizeTarget;
use gainstage_core::{GainstageError, ParamGroup, ParamSpec, ParamStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Channels processed independently instead of linked per track
pub const STEREO_INDEPENDENT: ParamSpec<bool> =
    ParamSpec::new("StereoIndependent", false, false, true);

/// Target integrated loudness in LUFS
pub const LUFS_LEVEL: ParamSpec<f64> = ParamSpec::new("LUFSLevel", -23.0, -145.0, 0.0);

/// Target RMS level in dBFS
pub const RMS_LEVEL: ParamSpec<f64> = ParamSpec::new("RMSLevel", -20.0, -145.0, 0.0);

/// Treat mono as dual mono when measuring loudness
pub const DUAL_MONO: ParamSpec<bool> = ParamSpec::new("DualMono", true, false, true);

/// Index of the [`NormalizeTarget`]
pub const NORMALIZE_TO: ParamSpec<i64> = ParamSpec::new("NormalizeTo", 0, 0, 1);

/// Preference group written by older releases
pub const LEGACY_SETTINGS_GROUP: &str = "/Effects/Loudness/";

/// Preference group holding the current settings
pub const CURRENT_SETTINGS_GROUP: &str = "/Effects/LoudnessNormalization/CurrentSettings/";

/// User-facing settings of the loudness normalize effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudnessSettings {
    pub stereo_independent: bool,
    pub lufs_level: f64,
    pub rms_level: f64,
    pub dual_mono: bool,
    pub normalize_to: NormalizeTarget,
}

impl Default for LoudnessSettings {
    fn default() -> Self {
        Self {
            stereo_independent: STEREO_INDEPENDENT.default,
            lufs_level: LUFS_LEVEL.default,
            rms_level: RMS_LEVEL.default,
            dual_mono: DUAL_MONO.default,
            normalize_to: NormalizeTarget::Loudness,
        }
    }
}

impl LoudnessSettings {
    /// Read and verify every parameter; absent keys keep their defaults
    pub fn from_params(store: &dyn ParamStore) -> Result<Self> {
        let index = NORMALIZE_TO.read(store)?;
        let normalize_to = NormalizeTarget::from_index(index).ok_or_else(|| {
            GainstageError::invalid_parameter(NORMALIZE_TO.key, format!("unknown target {index}"))
        })?;

        Ok(Self {
            stereo_independent: STEREO_INDEPENDENT.read(store)?,
            lufs_level: LUFS_LEVEL.read(store)?,
            rms_level: RMS_LEVEL.read(store)?,
            dual_mono: DUAL_MONO.read(store)?,
            normalize_to,
        })
    }

    /// Write every parameter
    pub fn to_params(&self, store: &mut dyn ParamStore) {
        STEREO_INDEPENDENT.write(store, self.stereo_independent);
        LUFS_LEVEL.write(store, self.lufs_level);
        RMS_LEVEL.write(store, self.rms_level);
        DUAL_MONO.write(store, self.dual_mono);
        NORMALIZE_TO.write(store, self.normalize_to.index());
    }

    /// Check both levels against their documented ranges
    pub fn validate(&self) -> Result<()> {
        for (spec, value) in [(LUFS_LEVEL, self.lufs_level), (RMS_LEVEL, self.rms_level)] {
            if !spec.contains(value) {
                return Err(GainstageError::invalid_parameter(
                    spec.key,
                    format!("{value} outside {}..={}", spec.min, spec.max),
                )
                .into());
            }
        }
        Ok(())
    }

    /// Level of the selected target (LUFS or dBFS)
    pub fn active_level_db(&self) -> f64 {
        match self.normalize_to {
            NormalizeTarget::Loudness => self.lufs_level,
            NormalizeTarget::Rms => self.rms_level,
        }
    }

    /// Whether the dual mono option affects measurement
    pub fn dual_mono_applies(&self) -> bool {
        self.dual_mono && self.normalize_to == NormalizeTarget::Loudness
    }
}

/// Notified after a validated settings change
pub trait SettingsObserver {
    fn settings_changed(&mut self, settings: &LoudnessSettings);
}

impl<F: FnMut(&LoudnessSettings)> SettingsObserver for F {
    fn settings_changed(&mut self, settings: &LoudnessSettings) {
        self(settings);
    }
}

/// Settings holder that notifies observers of every accepted change
///
/// Rejected changes leave the settings and observers untouched.
#[derive(Default)]
pub struct LoudnessEffect {
    settings: LoudnessSettings,
    observers: Vec<Box<dyn SettingsObserver + Send>>,
}

impl LoudnessEffect {
    pub fn new(settings: LoudnessSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            observers: Vec::new(),
        })
    }

    pub fn settings(&self) -> &LoudnessSettings {
        &self.settings
    }

    pub fn subscribe(&mut self, observer: impl SettingsObserver + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Replace all settings at once
    pub fn set_settings(&mut self, settings: LoudnessSettings) -> Result<()> {
        settings.validate()?;
        if settings != self.settings {
            self.settings = settings;
            self.notify();
        }
        Ok(())
    }

    pub fn set_stereo_independent(&mut self, independent: bool) -> Result<()> {
        self.set_settings(LoudnessSettings {
            stereo_independent: independent,
            ..self.settings
        })
    }

    pub fn set_lufs_level(&mut self, level: f64) -> Result<()> {
        self.set_settings(LoudnessSettings {
            lufs_level: level,
            ..self.settings
        })
    }

    pub fn set_rms_level(&mut self, level: f64) -> Result<()> {
        self.set_settings(LoudnessSettings {
            rms_level: level,
            ..self.settings
        })
    }

    pub fn set_dual_mono(&mut self, dual_mono: bool) -> Result<()> {
        self.set_settings(LoudnessSettings {
            dual_mono,
            ..self.settings
        })
    }

    pub fn set_normalize_to(&mut self, target: NormalizeTarget) -> Result<()> {
        self.set_settings(LoudnessSettings {
            normalize_to: target,
            ..self.settings
        })
    }

    /// Load from a parameter store, notifying observers on change
    pub fn load(&mut self, store: &dyn ParamStore) -> Result<()> {
        let settings = LoudnessSettings::from_params(store)?;
        self.set_settings(settings)
    }

    pub fn save(&self, store: &mut dyn ParamStore) {
        self.settings.to_params(store);
    }

    fn notify(&mut self) {
        debug!(observers = self.observers.len(), settings = ?self.settings, "Settings changed");
        for observer in &mut self.observers {
            observer.settings_changed(&self.settings);
        }
    }
}

/// Move settings saved by older releases to the current group
///
/// When the legacy group exists, defaults with independent channel
/// processing are written to [`CURRENT_SETTINGS_GROUP`] and the store is
/// flushed. Returns whether a migration happened.
pub fn migrate_legacy_settings(store: &mut dyn ParamStore) -> Result<bool> {
    if !store.contains_group(LEGACY_SETTINGS_GROUP) {
        return Ok(false);
    }

    let settings = LoudnessSettings {
        stereo_independent: true,
        ..LoudnessSettings::default()
    };
    settings.to_params(&mut ParamGroup::new(store, CURRENT_SETTINGS_GROUP));
    store.flush()?;

    info!(
        from = LEGACY_SETTINGS_GROUP,
        to = CURRENT_SETTINGS_GROUP,
        "Migrated legacy loudness settings"
    );
    Ok(true)
}
