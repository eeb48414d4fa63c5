//! gainstage CLI Library
//!
//! WAV loading, configuration and level reporting behind the
//! `gainstage-cli` binary. Exposed as a library for testing.

pub mod analyze;
pub mod config;
pub mod error;
pub mod wav;

pub use analyze::{analyze_track, TrackLevels};
pub use config::{CliConfig, NormalizeOverrides};
pub use error::{CliError, Result};
pub use wav::{read_wav, write_wav};
