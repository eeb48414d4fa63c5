//! Suspend/resume and stream-group routing for one live effect
//!
//! [`RealtimeEffectState`] sits between a playback engine and a shared
//! [`RealtimeEffect`]. The engine registers each stream group once with
//! [`add_track`](RealtimeEffectState::add_track), then feeds fixed-size
//! chunks through [`process`](RealtimeEffectState::process). While the
//! effect is suspended, or for groups it never accepted, audio is copied
//! straight through so toggling the effect never drops output.
//!
//! The suspend count is shared with any number of [`SuspendHandle`]s so a
//! control thread can toggle the effect while the audio thread owns the
//! state.

use crate::effect::RealtimeEffect;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Most channels per stream group, and per processor side
pub const MAX_CHANNELS: usize = 8;

type Inputs<'a> = SmallVec<[&'a [f32]; MAX_CHANNELS]>;
type Outputs<'a> = SmallVec<[&'a mut [f32]; MAX_CHANNELS]>;

/// Cloneable control over an effect's suspend count
///
/// The count starts at 1: effects begin suspended and need one
/// [`resume`](Self::resume) to go live. Suspends and resumes stack.
#[derive(Clone)]
pub struct SuspendHandle {
    count: Arc<AtomicUsize>,
    effect: Arc<dyn RealtimeEffect>,
}

impl SuspendHandle {
    /// Add one suspension
    ///
    /// Returns true when this call took the effect out of the active state.
    pub fn suspend(&self) -> bool {
        let previous = self.count.fetch_add(1, Ordering::AcqRel);
        if previous == 0 {
            if !self.effect.realtime_suspend() {
                warn!(effect = self.effect.name(), "Effect suspend hook failed");
            }
            debug!(effect = self.effect.name(), "Effect suspended");
        }
        previous == 0
    }

    /// Remove one suspension, never going below zero
    ///
    /// Returns whether the effect is active afterwards.
    pub fn resume(&self) -> bool {
        match self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            }) {
            Ok(1) => {
                if !self.effect.realtime_resume() {
                    warn!(effect = self.effect.name(), "Effect resume hook failed");
                }
                debug!(effect = self.effect.name(), "Effect resumed");
                true
            }
            Ok(_) => false,
            // Already active
            Err(_) => true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.count.load(Ordering::Acquire) == 0
    }

    /// Outstanding suspensions
    pub fn suspend_count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GroupRoute {
    first_processor: usize,
    channels: usize,
}

/// Live state of one effect across all stream groups
pub struct RealtimeEffectState {
    handle: SuspendHandle,
    /// First processor of each registered group, indexed by group
    routes: Vec<Option<GroupRoute>>,
    /// Index the next processor will get
    current_processor: usize,
    /// Sinks for processor outputs with no channel to land in
    scratch: Vec<Vec<f32>>,
    /// Samples every scratch buffer can hold
    scratch_len: usize,
}

impl RealtimeEffectState {
    /// Wrap `effect`; the state starts suspended
    pub fn new(effect: Arc<dyn RealtimeEffect>) -> Self {
        Self {
            handle: SuspendHandle {
                count: Arc::new(AtomicUsize::new(1)),
                effect,
            },
            routes: Vec::new(),
            current_processor: 0,
            scratch: Vec::new(),
            scratch_len: 0,
        }
    }

    pub fn effect(&self) -> &Arc<dyn RealtimeEffect> {
        &self.handle.effect
    }

    /// Handle for suspending and resuming from another thread
    pub fn suspend_handle(&self) -> SuspendHandle {
        self.handle.clone()
    }

    /// See [`SuspendHandle::suspend`]
    pub fn suspend(&self) -> bool {
        self.handle.suspend()
    }

    /// See [`SuspendHandle::resume`]
    pub fn resume(&self) -> bool {
        self.handle.resume()
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }

    /// Processors added since the last reset
    pub fn processor_count(&self) -> usize {
        self.current_processor
    }

    /// First processor serving `group`, if the group is registered
    pub fn first_processor(&self, group: usize) -> Option<usize> {
        self.route(group).map(|route| route.first_processor)
    }

    /// Register a stream group of `channels` channels at `sample_rate`
    ///
    /// Group 0 starts a new configuration and forgets every earlier group,
    /// once the layout has been accepted.
    /// Processors are added while both input and output channels remain:
    /// each takes the effect's input count (fewer remaining inputs are all
    /// taken at once) and output count (missing outputs go to scratch).
    ///
    /// Returns false, leaving the group unregistered, when the layout is
    /// unusable or the effect refuses a processor.
    pub fn add_track(&mut self, group: usize, channels: usize, sample_rate: f32) -> bool {
        let effect = Arc::clone(&self.handle.effect);
        let ins = effect.audio_in_count();
        let outs = effect.audio_out_count();
        let block_size = effect.block_size();

        if channels == 0 || channels > MAX_CHANNELS {
            warn!(effect = effect.name(), group, channels, "Unsupported channel count");
            return false;
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            warn!(effect = effect.name(), group, sample_rate, "Invalid sample rate");
            return false;
        }
        if !(1..=MAX_CHANNELS).contains(&ins)
            || !(1..=MAX_CHANNELS).contains(&outs)
            || block_size == 0
        {
            warn!(
                effect = effect.name(),
                ins, outs, block_size, "Effect reports an unusable layout"
            );
            return false;
        }

        if group == 0 {
            self.routes.clear();
            self.current_processor = 0;
        }

        // Scratch sized before the audio thread can ask for it
        if self.scratch.len() < outs {
            self.scratch.resize_with(outs, Vec::new);
        }
        let scratch_len = self.scratch_len.max(block_size);
        for buffer in &mut self.scratch {
            buffer.resize(scratch_len, 0.0);
        }
        self.scratch_len = scratch_len;

        let first_processor = self.current_processor;
        let (mut in_left, mut out_left) = (channels, channels);
        while in_left > 0 && out_left > 0 {
            in_left = in_left.saturating_sub(ins);
            out_left = out_left.saturating_sub(outs);

            if !effect.realtime_add_processor(ins, sample_rate) {
                warn!(
                    effect = effect.name(),
                    group,
                    processor = self.current_processor,
                    "Effect refused processor"
                );
                if let Some(route) = self.routes.get_mut(group) {
                    *route = None;
                }
                return false;
            }
            self.current_processor += 1;
        }

        if self.routes.len() <= group {
            self.routes.resize(group + 1, None);
        }
        self.routes[group] = Some(GroupRoute {
            first_processor,
            channels,
        });

        debug!(
            effect = effect.name(),
            group,
            channels,
            first_processor,
            processors = self.current_processor - first_processor,
            "Stream group added"
        );
        true
    }

    /// Run one chunk of a group through the effect
    ///
    /// `len` is limited to the shortest slice. When suspended, for unknown
    /// groups, or when `channels` differs from the registered count, input is
    /// copied to output and `len` returned. Otherwise each processor gets
    /// sub-blocks of at most the effect's block size and the samples
    /// produced by the group's last processor are returned. Outputs no
    /// processor writes receive their input.
    ///
    /// Never allocates, locks, logs or panics.
    pub fn process(
        &mut self,
        group: usize,
        channels: usize,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        len: usize,
    ) -> usize {
        let channels = channels.min(inputs.len()).min(outputs.len());
        let inputs = &inputs[..channels];
        let outputs = &mut outputs[..channels];
        let len = inputs
            .iter()
            .map(|input| input.len())
            .chain(outputs.iter().map(|output| output.len()))
            .fold(len, usize::min);

        let effect = &*self.handle.effect;
        let ins = effect.audio_in_count();
        let outs = effect.audio_out_count();

        let route = match self.route(group) {
            Some(route)
                if channels > 0
                    && route.channels == channels
                    && self.handle.is_active()
                    && (1..=MAX_CHANNELS).contains(&ins)
                    && (1..=MAX_CHANNELS).contains(&outs)
                    && outs <= self.scratch.len() =>
            {
                route
            }
            _ => {
                copy_through(inputs, outputs, 0, len);
                return len;
            }
        };

        let block_size = effect.block_size().clamp(1, self.scratch_len.max(1));
        let mut processor = route.first_processor;
        let (mut in_index, mut out_index) = (0, 0);
        let mut produced = 0;

        while in_index < channels && out_index < channels {
            let in_left = channels - in_index;
            let out_left = channels - out_index;
            let routed_outs = outs.min(out_left);

            produced = 0;
            let mut offset = 0;
            while offset < len {
                let count = (len - offset).min(block_size);
                let end = offset + count;

                // Fewer inputs than the processor takes: cycle the remaining ones
                let block_in: Inputs<'_> = (0..ins)
                    .map(|k| &inputs[in_index + k % in_left][offset..end])
                    .collect();
                let mut block_out: Outputs<'_> = outputs[out_index..out_index + routed_outs]
                    .iter_mut()
                    .map(|output| &mut output[offset..end])
                    .chain(
                        self.scratch[..outs - routed_outs]
                            .iter_mut()
                            .map(|buffer| &mut buffer[..count]),
                    )
                    .collect();

                produced += effect.realtime_process(processor, &block_in, &mut block_out, count);
                offset = end;
            }

            in_index += ins.min(in_left);
            out_index += routed_outs;
            processor += 1;
        }

        copy_through(inputs, outputs, out_index, len);
        produced
    }

    fn route(&self, group: usize) -> Option<GroupRoute> {
        self.routes.get(group).copied().flatten()
    }
}

/// Copy `len` samples of each channel from `first` on
fn copy_through(inputs: &[&[f32]], outputs: &mut [&mut [f32]], first: usize, len: usize) {
    for (input, output) in inputs.iter().zip(outputs.iter_mut()).skip(first) {
        let n = len.min(input.len()).min(output.len());
        output[..n].copy_from_slice(&input[..n]);
    }
}
