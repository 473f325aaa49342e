//! Concurrency-safe container around [`ClockModel`].
//!
//! One writer (the cadence loop) and any number of readers. The lock is
//! held only while the model is copied out or updated in place, never
//! across a network operation.

use std::sync::{Arc, PoisonError, RwLock};

use super::model::{ClockModel, ClockSnapshot, ClockState, ConvergenceStatus};
use super::monotonic::MonotonicClock;
use crate::error::SyncError;
use crate::probe::ProbeSample;

/// Write handle to the shared model, owned by the cadence loop
#[derive(Debug, Clone)]
pub struct SharedClockModel {
    model: Arc<RwLock<ClockModel>>,
    clock: Arc<dyn MonotonicClock>,
}

impl SharedClockModel {
    /// Create an uninitialized model read against `clock`
    #[must_use]
    pub fn new(clock: Arc<dyn MonotonicClock>) -> Self {
        Self {
            model: Arc::new(RwLock::new(ClockModel::new())),
            clock,
        }
    }

    /// Apply a burst sample timestamped at the current local time
    ///
    /// Returns the sample count after the update.
    pub fn apply(&self, sample: &ProbeSample) -> u64 {
        let now = self.clock.now_micros();
        let mut model = self.model.write().unwrap_or_else(PoisonError::into_inner);
        model.update(sample, now);
        model.sample_count()
    }

    /// Discard all history
    pub fn reset(&self) {
        self.model
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }

    /// Read-only handle for consumers
    #[must_use]
    pub fn reader(&self) -> ClockReader {
        ClockReader {
            model: Arc::clone(&self.model),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Read-side conversion API handed to the audio pipeline.
///
/// Cheap to clone; every call copies the model out under a read lock and
/// computes on the copy.
#[derive(Debug, Clone)]
pub struct ClockReader {
    model: Arc<RwLock<ClockModel>>,
    clock: Arc<dyn MonotonicClock>,
}

impl ClockReader {
    #[inline]
    fn load(&self) -> ClockModel {
        *self.model.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Convert reference time to local monotonic time
    ///
    /// # Errors
    ///
    /// Returns `ModelNotReady` until the first sample has been applied.
    pub fn master_to_local(&self, master_us: i64) -> Result<i64, SyncError> {
        self.load().master_to_local(master_us)
    }

    /// Convert local monotonic time to reference time
    ///
    /// # Errors
    ///
    /// Returns `ModelNotReady` until the first sample has been applied.
    pub fn local_to_master(&self, local_us: i64) -> Result<i64, SyncError> {
        self.load().local_to_master(local_us)
    }

    /// Current offset and skew
    ///
    /// # Errors
    ///
    /// Returns `ModelNotReady` until the first sample has been applied.
    pub fn get_state(&self) -> Result<ClockState, SyncError> {
        self.load().state()
    }

    /// Convergence of the most recent update
    ///
    /// # Errors
    ///
    /// Returns `ModelNotReady` until the first sample has been applied.
    pub fn convergence(&self) -> Result<ConvergenceStatus, SyncError> {
        self.load().convergence()
    }

    /// Full diagnostic copy of the model
    #[must_use]
    pub fn snapshot(&self) -> ClockSnapshot {
        self.load().snapshot()
    }

    /// Whether conversions are available
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.load().is_valid()
    }

    /// Current local monotonic time
    #[must_use]
    pub fn now_local(&self) -> i64 {
        self.clock.now_micros()
    }

    /// Current reference time
    ///
    /// # Errors
    ///
    /// Returns `ModelNotReady` until the first sample has been applied.
    pub fn now_master(&self) -> Result<i64, SyncError> {
        self.local_to_master(self.clock.now_micros())
    }
}
