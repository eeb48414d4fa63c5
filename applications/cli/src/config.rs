/// CLI configuration
use crate::error::{CliError, Result};
use gainstage_loudness::{LoudnessSettings, NormalizeTarget};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "gainstage.toml";

/// Prefix of environment overrides, e.g. `GAINSTAGE_NORMALIZE__LUFS_LEVEL`
pub const ENV_PREFIX: &str = "GAINSTAGE";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub normalize: LoudnessSettings,

    /// Storage block length used when loading WAV files
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            normalize: LoudnessSettings::default(),
            block_size: default_block_size(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `gainstage.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if config_path.exists() {
                    settings = settings.add_source(config::File::from(config_path));
                }
            }
        }

        // Override with environment variables (prefixed with GAINSTAGE_)
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(CliError::Config("block_size must be at least 1".to_string()));
        }
        self.normalize.validate()?;
        Ok(())
    }
}

/// Command-line flags layered over the configured settings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NormalizeOverrides {
    /// Normalize perceived loudness to this LUFS level
    pub lufs: Option<f64>,
    /// Normalize RMS to this dBFS level
    pub rms: Option<f64>,
    /// Process channels independently
    pub independent: bool,
}

impl NormalizeOverrides {
    /// Apply the flags; a level flag also selects its target
    pub fn apply(&self, settings: &mut LoudnessSettings) {
        if let Some(level) = self.lufs {
            settings.lufs_level = level;
            settings.normalize_to = NormalizeTarget::Loudness;
        }
        if let Some(level) = self.rms {
            settings.rms_level = level;
            settings.normalize_to = NormalizeTarget::Rms;
        }
        if self.independent {
            settings.stereo_independent = true;
        }
    }
}

fn default_block_size() -> usize {
    gainstage_core::memory::DEFAULT_BLOCK_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_flag_selects_target() {
        let mut settings = LoudnessSettings::default();
        NormalizeOverrides {
            rms: Some(-14.0),
            ..NormalizeOverrides::default()
        }
        .apply(&mut settings);

        assert_eq!(settings.normalize_to, NormalizeTarget::Rms);
        assert_eq!(settings.rms_level, -14.0);
        assert_eq!(settings.lufs_level, -23.0);
    }

    #[test]
    fn no_flags_keep_settings() {
        let mut settings = LoudnessSettings {
            stereo_independent: true,
            ..LoudnessSettings::default()
        };
        let before = settings;
        NormalizeOverrides::default().apply(&mut settings);
        assert_eq!(settings, before);
    }

    #[test]
    fn zero_block_size_rejected() {
        let config = CliConfig {
            block_size: 0,
            ..CliConfig::default()
        };
        assert!(matches!(config.validate(), Err(CliError::Config(_))));
    }
}
