use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Well-known time service port
pub const NTP_PORT: u16 = 123;

/// Logical service name advertised by the reference peer over mDNS
pub const DEFAULT_SERVICE_HOSTNAME: &str = "screamrouter";

/// Longest interval or timeout accepted by [`SyncConfig::validate`]
pub const MAX_CONFIG_DURATION: Duration = Duration::from_secs(3600);

/// Where the reference peer is looked up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerSource {
    /// Multicast DNS lookup of `<hostname>.local`
    Mdns {
        /// Host name without the `.local` suffix
        hostname: String,
        /// Port the peer answers probes on
        port: u16,
    },
    /// Unicast DNS name or IP literal
    Host {
        /// Host name or address
        host: String,
        /// Port the peer answers probes on
        port: u16,
    },
}

impl PeerSource {
    /// mDNS source with the default port
    #[must_use]
    pub fn mdns(hostname: impl Into<String>) -> Self {
        Self::Mdns {
            hostname: hostname.into(),
            port: NTP_PORT,
        }
    }

    /// Unicast source; a port of 0 selects the well-known port
    #[must_use]
    pub fn host(host: impl Into<String>, port: u16) -> Self {
        Self::Host {
            host: host.into(),
            port: if port == 0 { NTP_PORT } else { port },
        }
    }

    /// The name handed to the resolver
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Mdns { hostname, .. } => hostname,
            Self::Host { host, .. } => host,
        }
    }

    /// Port probes are sent to
    #[must_use]
    pub fn port(&self) -> u16 {
        match self {
            Self::Mdns { port, .. } | Self::Host { port, .. } => *port,
        }
    }
}

impl Default for PeerSource {
    fn default() -> Self {
        Self::mdns(DEFAULT_SERVICE_HOSTNAME)
    }
}

impl fmt::Display for PeerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mdns { hostname, port } => write!(f, "mdns:{hostname}.local:{port}"),
            Self::Host { host, port } => write!(f, "{host}:{port}"),
        }
    }
}

/// Configuration for the clock synchronization engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Reference peer lookup (default: mDNS `screamrouter`)
    pub peer: PeerSource,

    /// Probes per burst (default: 8)
    pub burst_size: usize,

    /// Timeout for a single probe (default: 100ms)
    pub probe_timeout: Duration,

    /// Delay between probes of a burst (default: 10ms)
    pub inter_probe_delay: Duration,

    /// Successful bursts before leaving the lock phase (default: 10)
    pub lock_burst_count: u32,

    /// Burst interval during the lock phase (default: 200ms)
    pub lock_interval: Duration,

    /// Burst interval once steady (default: 1 second)
    pub steady_interval: Duration,

    /// Consecutive failures before the cached address is dropped (default: 3)
    pub max_consecutive_failures: u32,

    /// Minimum spacing of lookups while no address is cached (default: 5 seconds)
    pub resolution_retry_interval: Duration,

    /// Timeout for a single lookup (default: 3 seconds)
    pub resolution_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            peer: PeerSource::default(),
            burst_size: 8,
            probe_timeout: Duration::from_millis(100),
            inter_probe_delay: Duration::from_millis(10),
            lock_burst_count: 10,
            lock_interval: Duration::from_millis(200),
            steady_interval: Duration::from_millis(1000),
            max_consecutive_failures: 3,
            resolution_retry_interval: Duration::from_millis(5000),
            resolution_timeout: Duration::from_millis(3000),
        }
    }
}

impl SyncConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Check that every count and interval is usable
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` naming the first offending field.
    pub fn validate(&self) -> Result<(), SyncError> {
        let invalid = |name: &str, message: &str| SyncError::InvalidParameter {
            name: name.to_string(),
            message: message.to_string(),
        };

        if self.burst_size == 0 {
            return Err(invalid("burst_size", "must be at least 1"));
        }
        if self.probe_timeout.is_zero() {
            return Err(invalid("probe_timeout", "must be non-zero"));
        }
        if self.lock_interval.is_zero() || self.steady_interval.is_zero() {
            return Err(invalid("interval", "probe intervals must be non-zero"));
        }
        if self.resolution_timeout.is_zero() {
            return Err(invalid("resolution_timeout", "must be non-zero"));
        }
        for (name, value) in [
            ("probe_timeout", self.probe_timeout),
            ("inter_probe_delay", self.inter_probe_delay),
            ("lock_interval", self.lock_interval),
            ("steady_interval", self.steady_interval),
            ("resolution_retry_interval", self.resolution_retry_interval),
            ("resolution_timeout", self.resolution_timeout),
        ] {
            if value > MAX_CONFIG_DURATION {
                return Err(invalid(name, "must not exceed one hour"));
            }
        }
        if self.max_consecutive_failures == 0 {
            return Err(invalid("max_consecutive_failures", "must be at least 1"));
        }
        if self.peer.name().is_empty() {
            return Err(invalid("peer", "host name is empty"));
        }
        Ok(())
    }

    /// Worst-case time a burst can hold the cadence loop
    #[must_use]
    pub fn max_burst_duration(&self) -> Duration {
        let probes = u32::try_from(self.burst_size).unwrap_or(u32::MAX);
        self.probe_timeout
            .saturating_mul(probes)
            .saturating_add(self.inter_probe_delay.saturating_mul(probes.saturating_sub(1)))
    }
}

/// Builder for `SyncConfig`
#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    /// Set the reference peer source
    #[must_use]
    pub fn peer(mut self, peer: PeerSource) -> Self {
        self.config.peer = peer;
        self
    }

    /// Set probes per burst
    #[must_use]
    pub fn burst_size(mut self, size: usize) -> Self {
        self.config.burst_size = size;
        self
    }

    /// Set the per-probe timeout
    #[must_use]
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Set the delay between probes of a burst
    #[must_use]
    pub fn inter_probe_delay(mut self, delay: Duration) -> Self {
        self.config.inter_probe_delay = delay;
        self
    }

    /// Set the number of lock-phase bursts and their interval
    #[must_use]
    pub fn lock_phase(mut self, bursts: u32, interval: Duration) -> Self {
        self.config.lock_burst_count = bursts;
        self.config.lock_interval = interval;
        self
    }

    /// Set the steady-phase interval
    #[must_use]
    pub fn steady_interval(mut self, interval: Duration) -> Self {
        self.config.steady_interval = interval;
        self
    }

    /// Set the consecutive failure threshold
    #[must_use]
    pub fn max_consecutive_failures(mut self, max: u32) -> Self {
        self.config.max_consecutive_failures = max;
        self
    }

    /// Set the lookup retry interval
    #[must_use]
    pub fn resolution_retry_interval(mut self, interval: Duration) -> Self {
        self.config.resolution_retry_interval = interval;
        self
    }

    /// Set the lookup timeout
    #[must_use]
    pub fn resolution_timeout(mut self, timeout: Duration) -> Self {
        self.config.resolution_timeout = timeout;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> SyncConfig {
        self.config
    }
}
