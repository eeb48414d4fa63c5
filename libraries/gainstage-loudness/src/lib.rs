//! Block-streamed loudness normalization for gainstage
//!
//! This crate provides:
//! - Block iteration over a track's selected range, bounded by the track's
//!   natural block size and a reusable buffer
//! - EBU R128 integrated loudness and RMS measurement per channel group
//! - Correction factor calculation for a LUFS or dBFS target
//! - A two-pass measure/apply processor that commits all tracks or none
//! - Effect settings with range checks, observers and legacy migration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐
//! │   Track     │ ──► │ SampleBuffer │ ──► │ LevelAnalyzer │   pass 1
//! └─────────────┘     └──────────────┘     └───────────────┘
//!                                                  │
//!                                                  ▼
//!                                          ┌───────────────┐
//!                                          │LevelCalculator│
//!                                          └───────────────┘
//!                                                  │ factor
//!                                                  ▼
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐
//! │   Track     │ ──► │ SampleBuffer │ ──► │ scale + store │   pass 2
//! └─────────────┘     └──────────────┘     └───────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gainstage_core::{CancellationToken, Selection};
//! use gainstage_loudness::{normalize_tracks, LoudnessSettings};
//!
//! let token = CancellationToken::new();
//! let mut progress = token.reporter(|fraction: f64, message: &str| {
//!     println!("{:>5.1}% {message}", fraction * 100.0);
//!     true
//! });
//!
//! let report = normalize_tracks(
//!     &LoudnessSettings::default(),
//!     &mut tracks,
//!     Selection::whole(),
//!     &mut progress,
//! )?;
//! println!("{} tracks normalized", report.processed());
//! ```

#![deny(unsafe_code)]

mod analysis;
mod blocks;
mod buffer;
mod error;
mod level;
mod normalize;
mod processor;
mod settings;

pub use analysis::{LevelAnalyzer, MAX_CHANNELS};
pub use blocks::{Block, BlockCursor, Blocks};
pub use buffer::SampleBuffer;
pub use error::{LoudnessError, Result};
pub use level::{
    compute_correction, db_to_linear, linear_to_db, LevelCalculator, NormalizeTarget,
    MAX_LEVEL_DB, MIN_LEVEL_DB,
};
pub use normalize::{normalize_tracks, LoudnessNormalizer, DESCRIPTION};
pub use processor::{ProcessReport, TrackOutcome, TrackReport, TwoPassEffect, TwoPassProcessor};
pub use settings::{
    migrate_legacy_settings, LoudnessEffect, LoudnessSettings, SettingsObserver,
    CURRENT_SETTINGS_GROUP, DUAL_MONO, LEGACY_SETTINGS_GROUP, LUFS_LEVEL, NORMALIZE_TO,
    RMS_LEVEL, STEREO_INDEPENDENT,
};

/// EBU R128 broadcast reference level (-23 LUFS)
pub const EBU_R128_BROADCAST_LUFS: f64 = -23.0;

/// Common streaming platform reference level (-14 LUFS)
pub const EBU_R128_STREAMING_LUFS: f64 = -14.0;
