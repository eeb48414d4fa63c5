//! gainstage Core
//!
//! Contracts between the gainstage engine and the hosts that embed it.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Tracks**: the [`Track`] trait a host implements for random-access
//!   sample storage, plus [`MemoryTrack`], a copy-on-write in-memory host
//! - **Progress**: [`ProgressReporter`] and [`CancellationToken`] for
//!   cooperative cancellation at block boundaries
//! - **Parameters**: the flat [`ParamStore`] key-value contract and the
//!   [`ParamSpec`] ranges checked when reading from it
//! - **Error Handling**: unified [`GainstageError`] and [`Result`] types
//!
//! # Example
//!
//! ```rust
//! use gainstage_core::{MemoryTrack, Track};
//!
//! let track = MemoryTrack::from_channels("Tone", 48000, vec![vec![0.25; 4800]]);
//! assert_eq!(track.channel_count(), 1);
//! assert!((track.end_time() - 0.1).abs() < 1e-9);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod memory;
pub mod params;
pub mod progress;
pub mod track;

pub use error::{GainstageError, Result};
pub use memory::MemoryTrack;
pub use params::{MemoryParamStore, ParamGroup, ParamKind, ParamSpec, ParamStore, ParamValue};
pub use progress::{CancellationToken, NoProgress, ProgressReporter};
pub use track::{ChannelGroup, SampleRange, Selection, Track};
