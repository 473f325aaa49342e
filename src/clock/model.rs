//! Software PLL mapping local monotonic time to reference time.
//!
//! The model is linear: `master = skew * local + offset`. Offset follows
//! each burst sample quickly; skew is only re-estimated over baselines of
//! at least one second so back-to-back samples cannot blow up the rate.

use crate::error::SyncError;
use crate::probe::ProbeSample;

/// Weight of a new skew observation
pub const SKEW_GAIN: f64 = 0.1;

/// Weight of a new offset observation
pub const OFFSET_GAIN: f64 = 0.3;

/// Minimum local time between skew observations, in microseconds
pub const SKEW_BASELINE_US: i64 = 1_000_000;

/// Prediction error below which the model counts as converged, in microseconds
pub const CONVERGED_ERROR_US: i64 = 500;

/// Lifecycle of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPhase {
    /// No sample applied yet; conversions fail
    Uninitialized,
    /// Exactly one sample applied; skew is still the 1.0 prior
    Locking,
    /// Two or more samples applied
    Tracking,
}

/// Current offset and rate error as reported to consumers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockState {
    /// Offset of reference time over local time, in microseconds
    pub offset_us: f64,
    /// Rate error in parts per million, `(skew - 1) * 1e6`
    pub skew_ppm: f64,
}

/// How closely the last sample matched the model's prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceStatus {
    /// Whether `|last_error_us|` is below [`CONVERGED_ERROR_US`]
    pub converged: bool,
    /// Measured minus predicted reference time at the last update
    pub last_error_us: i64,
    /// Samples applied since the last reset
    pub sample_count: u64,
}

/// Complete copy of the model for diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSnapshot {
    /// Lifecycle phase
    pub phase: ModelPhase,
    /// Offset in microseconds
    pub offset_us: f64,
    /// Rate ratio of reference to local clock
    pub skew: f64,
    /// Rate error in parts per million
    pub skew_ppm: f64,
    /// Samples applied since the last reset
    pub sample_count: u64,
    /// Local time of the last applied sample
    pub last_sample_mono_us: i64,
    /// Measured minus predicted reference time at the last update
    pub last_error_us: i64,
}

/// Offset/skew estimate.
///
/// `Copy` so readers can take the whole state in one assignment and never
/// observe a skew from one update paired with an offset from another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockModel {
    skew: f64,
    offset_us: f64,
    last_update_mono_us: i64,
    last_master_us: i64,
    last_sample_mono_us: i64,
    last_error_us: i64,
    valid: bool,
    sample_count: u64,
}

impl Default for ClockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockModel {
    /// Create an uninitialized model
    #[must_use]
    pub const fn new() -> Self {
        Self {
            skew: 1.0,
            offset_us: 0.0,
            last_update_mono_us: 0,
            last_master_us: 0,
            last_sample_mono_us: 0,
            last_error_us: 0,
            valid: false,
            sample_count: 0,
        }
    }

    /// Fold one burst sample taken at local time `now_mono_us` into the model
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn update(&mut self, sample: &ProbeSample, now_mono_us: i64) {
        let master_us = now_mono_us.saturating_add(sample.offset_us);

        if !self.valid {
            self.skew = 1.0;
            self.offset_us = sample.offset_us as f64;
            self.last_update_mono_us = now_mono_us;
            self.last_master_us = master_us;
            self.last_sample_mono_us = now_mono_us;
            self.last_error_us = 0;
            self.valid = true;
            self.sample_count = 1;

            tracing::info!(
                offset_us = self.offset_us,
                rtt_us = sample.round_trip_us,
                "Clock model initialized"
            );
            return;
        }

        let predicted_us = self.skew * now_mono_us as f64 + self.offset_us;
        self.last_error_us = (master_us as f64 - predicted_us).round() as i64;

        let dt_mono = now_mono_us - self.last_update_mono_us;
        if dt_mono >= SKEW_BASELINE_US {
            let observed_skew = (master_us - self.last_master_us) as f64 / dt_mono as f64;
            self.skew = (1.0 - SKEW_GAIN) * self.skew + SKEW_GAIN * observed_skew;
            self.last_update_mono_us = now_mono_us;
            self.last_master_us = master_us;
        }

        self.offset_us =
            (1.0 - OFFSET_GAIN) * self.offset_us + OFFSET_GAIN * sample.offset_us as f64;
        self.last_sample_mono_us = now_mono_us;
        self.sample_count += 1;

        tracing::debug!(
            offset_us = self.offset_us,
            skew_ppm = self.skew_ppm(),
            error_us = self.last_error_us,
            samples = self.sample_count,
            "Clock model updated"
        );
    }

    /// Return to the uninitialized state
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Convert reference time to local monotonic time
    ///
    /// # Errors
    ///
    /// Returns `ModelNotReady` before the first sample or if skew is zero.
    pub fn master_to_local(&self, master_us: i64) -> Result<i64, SyncError> {
        if !self.valid || self.skew == 0.0 {
            return Err(SyncError::ModelNotReady);
        }
        #[allow(clippy::cast_precision_loss)]
        let local = (master_us as f64 - self.offset_us) / self.skew;
        to_micros(local)
    }

    /// Convert local monotonic time to reference time
    ///
    /// # Errors
    ///
    /// Returns `ModelNotReady` before the first sample.
    pub fn local_to_master(&self, local_us: i64) -> Result<i64, SyncError> {
        if !self.valid {
            return Err(SyncError::ModelNotReady);
        }
        #[allow(clippy::cast_precision_loss)]
        let master = self.skew * local_us as f64 + self.offset_us;
        to_micros(master)
    }

    /// Current offset and skew in ppm
    ///
    /// # Errors
    ///
    /// Returns `ModelNotReady` before the first sample.
    pub fn state(&self) -> Result<ClockState, SyncError> {
        if !self.valid {
            return Err(SyncError::ModelNotReady);
        }
        Ok(ClockState {
            offset_us: self.offset_us,
            skew_ppm: self.skew_ppm(),
        })
    }

    /// Convergence of the last update
    ///
    /// # Errors
    ///
    /// Returns `ModelNotReady` before the first sample.
    pub fn convergence(&self) -> Result<ConvergenceStatus, SyncError> {
        if !self.valid {
            return Err(SyncError::ModelNotReady);
        }
        Ok(ConvergenceStatus {
            converged: self.last_error_us.abs() < CONVERGED_ERROR_US,
            last_error_us: self.last_error_us,
            sample_count: self.sample_count,
        })
    }

    /// Copy every field out for diagnostics
    #[must_use]
    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            phase: self.phase(),
            offset_us: self.offset_us,
            skew: self.skew,
            skew_ppm: self.skew_ppm(),
            sample_count: self.sample_count,
            last_sample_mono_us: self.last_sample_mono_us,
            last_error_us: self.last_error_us,
        }
    }

    /// Lifecycle phase derived from the sample count
    #[must_use]
    pub fn phase(&self) -> ModelPhase {
        match (self.valid, self.sample_count) {
            (false, _) => ModelPhase::Uninitialized,
            (true, 0 | 1) => ModelPhase::Locking,
            (true, _) => ModelPhase::Tracking,
        }
    }

    /// Whether conversions are available
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Samples applied since the last reset
    #[must_use]
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Current offset in microseconds
    #[must_use]
    pub fn offset_us(&self) -> f64 {
        self.offset_us
    }

    /// Current rate ratio
    #[must_use]
    pub fn skew(&self) -> f64 {
        self.skew
    }

    /// Current rate error in parts per million
    #[must_use]
    pub fn skew_ppm(&self) -> f64 {
        (self.skew - 1.0) * 1e6
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn to_micros(value: f64) -> Result<i64, SyncError> {
    let rounded = value.round();
    if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return Err(SyncError::InvalidParameter {
            name: "timestamp".to_string(),
            message: format!("converted value {value} out of range"),
        });
    }
    Ok(rounded as i64)
}
