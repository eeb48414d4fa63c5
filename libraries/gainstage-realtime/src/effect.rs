//! Live effect contract
//!
//! One effect instance is shared by every stream group it is applied to, so
//! all methods take `&self` and implementors synchronize their own state.

/// Effect driven by a [`RealtimeEffectState`](crate::RealtimeEffectState)
///
/// The state splits each stream group into processors of
/// [`audio_in_count`](Self::audio_in_count) inputs and
/// [`audio_out_count`](Self::audio_out_count) outputs, and numbers them
/// consecutively in the order they were added.
///
/// # Real-Time Constraints
/// [`realtime_process`](Self::realtime_process) runs on the audio thread:
/// - No allocations
/// - No blocking operations
/// - Deterministic execution time
pub trait RealtimeEffect: Send + Sync {
    /// Effect name (for logging)
    fn name(&self) -> &str;

    /// Input channels consumed by one processor
    fn audio_in_count(&self) -> usize;

    /// Output channels produced by one processor
    fn audio_out_count(&self) -> usize;

    /// Most samples handed to one `realtime_process` call
    fn block_size(&self) -> usize;

    /// Prepare processor state for `channels` channels at `sample_rate`
    ///
    /// Returns false to refuse the configuration.
    fn realtime_add_processor(&self, channels: usize, sample_rate: f32) -> bool;

    /// Process `len` samples of each input into each output
    ///
    /// Every slice holds at least `len` samples. Returns the number of
    /// samples produced.
    fn realtime_process(
        &self,
        processor: usize,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        len: usize,
    ) -> usize;

    /// Called when the effect leaves the active state
    fn realtime_suspend(&self) -> bool {
        true
    }

    /// Called when the effect becomes active again
    fn realtime_resume(&self) -> bool {
        true
    }
}
