//! Live effect state for gainstage
//!
//! Lets a playback engine apply a shared effect to several stream groups
//! and toggle it without glitches:
//! - Reference-counted suspend/resume; suspended effects pass audio through
//! - Per-group processor routing with input replication and scratch outputs
//! - Allocation-free, lock-free processing on the audio thread
//!
//! # Example
//!
//! ```rust
//! use gainstage_realtime::{RealtimeEffectState, RealtimeGain};
//! use std::sync::Arc;
//!
//! let gain = Arc::new(RealtimeGain::from_db(-6.0));
//! let mut state = RealtimeEffectState::new(gain);
//! assert!(state.add_track(0, 2, 48000.0));
//!
//! // Control thread
//! let handle = state.suspend_handle();
//! handle.resume();
//!
//! // Audio thread
//! let left = [0.5_f32; 256];
//! let right = [0.5_f32; 256];
//! let mut out_left = [0.0_f32; 256];
//! let mut out_right = [0.0_f32; 256];
//! let produced = state.process(
//!     0,
//!     2,
//!     &[left.as_slice(), right.as_slice()],
//!     &mut [out_left.as_mut_slice(), out_right.as_mut_slice()],
//!     256,
//! );
//! assert_eq!(produced, 256);
//! assert!(out_left[0] < 0.26);
//! ```

#![deny(unsafe_code)]

mod effect;
mod gain;
mod state;

pub use effect::RealtimeEffect;
pub use gain::{RealtimeGain, DEFAULT_BLOCK_SIZE};
pub use state::{RealtimeEffectState, SuspendHandle, MAX_CHANNELS};
