//! Error types for block-streamed normalization

use gainstage_core::GainstageError;
use thiserror::Error;

/// Result type for loudness operations
pub type Result<T> = std::result::Result<T, LoudnessError>;

/// Errors that abort a normalization run
///
/// Any of these stops the whole multi-track operation; nothing is committed.
#[derive(Error, Debug)]
pub enum LoudnessError {
    /// Linked channels returned different sample counts for the same block
    #[error(
        "Track {track}: channel {channel} read {actual} samples at {position}, expected {expected}"
    )]
    DataIntegrity {
        track: String,
        channel: usize,
        position: u64,
        expected: usize,
        actual: usize,
    },

    /// Asked to process a range with no samples in it
    #[error("Track {track}: selection is empty")]
    EmptyRange { track: String },

    /// The progress host asked to stop
    #[error("Cancelled while processing {track}")]
    Cancelled { track: String },

    /// Block longer than the sample buffer
    #[error("Block of {len} samples exceeds buffer capacity {capacity}")]
    BlockTooLarge { len: usize, capacity: usize },

    /// Invalid sample rate
    #[error("Invalid sample rate: {0} Hz (must be between 8000 and 384000)")]
    InvalidSampleRate(u32),

    /// Invalid channel count
    #[error("Invalid channel count: {0} (must be 1-8)")]
    InvalidChannelCount(usize),

    /// EBU R128 analysis error
    #[error("EBU R128 analysis failed: {0}")]
    Analysis(String),

    /// Track storage or parameter error from the host
    #[error(transparent)]
    Core(#[from] GainstageError),
}

impl From<ebur128::Error> for LoudnessError {
    fn from(err: ebur128::Error) -> Self {
        Self::Analysis(format!("{:?}", err))
    }
}
