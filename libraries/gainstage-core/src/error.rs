/// Core error types for gainstage
use thiserror::Error;

/// Result type alias using `GainstageError`
pub type Result<T> = std::result::Result<T, GainstageError>;

/// Core error type for gainstage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GainstageError {
    /// Track storage failed to read or write
    #[error("Track error: {0}")]
    Track(String),

    /// Channel index outside the track
    #[error("Channel {channel} out of range (track has {channels} channels)")]
    ChannelOutOfRange { channel: usize, channels: usize },

    /// Parameter present but failing validation
    #[error("Invalid parameter {key}: {reason}")]
    InvalidParameter { key: String, reason: String },

    /// Parameter stored with a different type than expected
    #[error("Parameter {key} has the wrong type (expected {expected})")]
    ParameterType { key: String, expected: &'static str },
}

impl GainstageError {
    /// Create a track error
    pub fn track(msg: impl Into<String>) -> Self {
        Self::Track(msg.into())
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
