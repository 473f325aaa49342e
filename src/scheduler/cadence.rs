use std::time::Duration;

use crate::types::SyncConfig;

/// Probing rate regime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadencePhase {
    /// Fast bursts right after start or a peer change
    Locking,
    /// Slow bursts once the lock burst count has been reached
    Steady,
}

/// Adaptive burst schedule owned by the cadence loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadenceState {
    probe_interval: Duration,
    bursts_completed: u32,
    phase: CadencePhase,
    lock_burst_count: u32,
    lock_interval: Duration,
    steady_interval: Duration,
}

impl CadenceState {
    /// Start in the lock phase with the intervals from `config`
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            probe_interval: config.lock_interval,
            bursts_completed: 0,
            phase: CadencePhase::Locking,
            lock_burst_count: config.lock_burst_count,
            lock_interval: config.lock_interval,
            steady_interval: config.steady_interval,
        }
    }

    /// Count a successful burst.
    ///
    /// Returns `true` on the burst that completes the lock phase.
    pub fn record_burst(&mut self) -> bool {
        self.bursts_completed = self.bursts_completed.saturating_add(1);
        if self.phase == CadencePhase::Locking && self.bursts_completed >= self.lock_burst_count {
            self.phase = CadencePhase::Steady;
            self.probe_interval = self.steady_interval;
            return true;
        }
        false
    }

    /// Go back to the start of the lock phase
    pub fn restart(&mut self) {
        self.bursts_completed = 0;
        self.phase = CadencePhase::Locking;
        self.probe_interval = self.lock_interval;
    }

    /// Time between the starts of consecutive bursts
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.probe_interval
    }

    /// Successful bursts since start or the last restart
    #[must_use]
    pub fn bursts_completed(&self) -> u32 {
        self.bursts_completed
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> CadencePhase {
        self.phase
    }
}
