//! Network condition simulation for testing

use rand::Rng;
use std::time::Duration;

/// Reply loss and delay applied by the mock time server
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkSimulator {
    /// Reply loss probability (0.0 to 1.0)
    pub loss_rate: f64,
    /// Random extra delay, uniformly in `0..jitter_ms`
    pub jitter_ms: u32,
    /// Base delay added to every reply
    pub delay_ms: u32,
}

impl NetworkSimulator {
    /// Perfect network (no loss, no delay)
    #[must_use]
    pub fn perfect() -> Self {
        Self {
            loss_rate: 0.0,
            jitter_ms: 0,
            delay_ms: 0,
        }
    }

    /// Busy `WiFi`: occasional loss and queuing jitter well under the probe timeout
    #[must_use]
    pub fn busy_wifi() -> Self {
        Self {
            loss_rate: 0.05,
            jitter_ms: 20,
            delay_ms: 2,
        }
    }

    /// Every reply lost
    #[must_use]
    pub fn blackhole() -> Self {
        Self {
            loss_rate: 1.0,
            ..Self::perfect()
        }
    }

    /// Fixed delay on every reply
    #[must_use]
    pub fn delayed(delay_ms: u32) -> Self {
        Self {
            delay_ms,
            ..Self::perfect()
        }
    }

    /// Should this reply be dropped?
    #[must_use]
    pub fn should_drop(&self) -> bool {
        if self.loss_rate <= 0.0 {
            return false;
        }
        if self.loss_rate >= 1.0 {
            return true;
        }
        rand::thread_rng().gen_bool(self.loss_rate)
    }

    /// Get delay for this reply
    #[must_use]
    pub fn get_delay(&self) -> Duration {
        let jitter: u32 = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..self.jitter_ms)
        } else {
            0
        };

        Duration::from_millis(u64::from(self.delay_ms + jitter))
    }
}

impl Default for NetworkSimulator {
    fn default() -> Self {
        Self::perfect()
    }
}
