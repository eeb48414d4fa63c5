//! Progress reporting and cooperative cancellation
//!
//! Long operations report a fraction in `[0, 1]` at every block boundary.
//! The reporter's answer decides whether work continues; there is no other
//! way to stop a pass, so a block already started always completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives progress updates and decides whether to continue
pub trait ProgressReporter {
    /// Report overall progress
    ///
    /// # Arguments
    /// * `fraction` - Completed share of the whole operation, non-decreasing
    /// * `message` - Status line for the current step
    ///
    /// Returns `true` to continue, `false` to cancel.
    fn update(&mut self, fraction: f64, message: &str) -> bool;
}

impl<F> ProgressReporter for F
where
    F: FnMut(f64, &str) -> bool,
{
    fn update(&mut self, fraction: f64, message: &str) -> bool {
        self(fraction, message)
    }
}

/// Reporter that ignores progress and never cancels
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn update(&mut self, _fraction: f64, _message: &str) -> bool {
        true
    }
}

/// Cancellation flag shared between a control thread and a worker
///
/// Cloning shares the flag.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation (observed at the next block boundary)
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Wrap a reporter so it also stops once this token is cancelled
    pub fn reporter<R: ProgressReporter>(&self, inner: R) -> CancellableReporter<R> {
        CancellableReporter {
            token: self.clone(),
            inner,
        }
    }
}

/// Reporter that forwards to an inner reporter unless cancelled
#[derive(Debug)]
pub struct CancellableReporter<R> {
    token: CancellationToken,
    inner: R,
}

impl<R: ProgressReporter> ProgressReporter for CancellableReporter<R> {
    fn update(&mut self, fraction: f64, message: &str) -> bool {
        !self.token.is_cancelled() && self.inner.update(fraction, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_reporters() {
        let mut seen = Vec::new();
        let mut reporter = |fraction: f64, _msg: &str| {
            seen.push(fraction);
            fraction < 0.5
        };
        assert!(reporter.update(0.25, "a"));
        assert!(!reporter.update(0.75, "b"));
        assert_eq!(seen, vec![0.25, 0.75]);
    }

    #[test]
    fn token_cancels_wrapped_reporter() {
        let token = CancellationToken::new();
        let mut reporter = token.reporter(NoProgress);
        assert!(reporter.update(0.1, ""));

        let remote = token.clone();
        std::thread::spawn(move || remote.cancel()).join().unwrap();

        assert!(token.is_cancelled());
        assert!(!reporter.update(0.2, ""));
    }
}
