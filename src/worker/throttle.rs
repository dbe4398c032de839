//! The throttle rule.
//!
//! Any worker that did real work snaps the target back to the maximum; every
//! idle or failed worker lowers it by one, never below one.

use super::outcome::WorkerOutcome;
use std::num::NonZeroUsize;

/// Target parallelism, kept in `[1, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    target: NonZeroUsize,
    max: NonZeroUsize,
}

impl Throttle {
    /// Start at full parallelism.
    pub fn new(max: NonZeroUsize) -> Self {
        Self { target: max, max }
    }

    pub fn target(&self) -> usize {
        self.target.get()
    }

    pub fn max(&self) -> usize {
        self.max.get()
    }

    /// Fold one outcome into the target and return the new target.
    pub fn record(&mut self, outcome: WorkerOutcome) -> usize {
        self.target = match outcome {
            WorkerOutcome::DidWork => self.max,
            WorkerOutcome::Idle | WorkerOutcome::Failed => {
                NonZeroUsize::new(self.target.get() - 1).unwrap_or(NonZeroUsize::MIN)
            }
        };
        self.target.get()
    }
}
