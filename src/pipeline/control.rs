//! Run coordination: single-flight lock, cancellation and stage counters

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::progress::Stage;

// ============================================================
// Single-flight lock
// ============================================================

/// Non-reentrant lock that rejects instead of waiting
#[derive(Debug, Default)]
pub struct SingleFlight {
    held: AtomicBool,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock if it is free.
    ///
    /// The lock is released when the returned guard is dropped, on every
    /// exit path including unwinding.
    pub fn try_acquire(&self) -> Option<SingleFlightGuard<'_>> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SingleFlightGuard { lock: self })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Holds a [`SingleFlight`] until dropped
#[derive(Debug)]
pub struct SingleFlightGuard<'a> {
    lock: &'a SingleFlight,
}

impl Drop for SingleFlightGuard<'_> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}

// ============================================================
// Cancellation
// ============================================================

/// Cooperative cancellation flag shared with a running batch
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop; images already in flight still finish
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

// ============================================================
// Stage counters
// ============================================================

/// One monotonically increasing counter per [`Stage`]
#[derive(Debug, Default)]
pub struct StageCounters {
    loaded: AtomicU64,
    inpainted: AtomicU64,
    written: AtomicU64,
    files: AtomicU64,
}

impl StageCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, stage: Stage) -> &AtomicU64 {
        match stage {
            Stage::Loading => &self.loaded,
            Stage::Inpainting => &self.inpainted,
            Stage::Writing => &self.written,
        }
    }

    /// Zero all counters for a run over `files` images
    pub(crate) fn reset(&self, files: usize) {
        for stage in Stage::ALL {
            self.counter(stage).store(0, Ordering::SeqCst);
        }
        self.files.store(files as u64, Ordering::SeqCst);
    }

    /// Increment one stage and return the summed progress afterwards
    pub fn advance(&self, stage: Stage) -> u64 {
        self.counter(stage).fetch_add(1, Ordering::SeqCst);
        self.done()
    }

    pub fn get(&self, stage: Stage) -> u64 {
        self.counter(stage).load(Ordering::SeqCst)
    }

    /// Sum of all stage counters
    pub fn done(&self) -> u64 {
        Stage::ALL.iter().map(|&stage| self.get(stage)).sum()
    }

    /// `files * 3`
    pub fn total(&self) -> u64 {
        self.files.load(Ordering::SeqCst) * Stage::COUNT
    }

    /// Overall progress in `[0, 1]`; 0 before any run
    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.done() as f64 / total as f64
        }
    }
}
