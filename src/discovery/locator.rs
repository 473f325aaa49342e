use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::resolver::Resolver;
use crate::error::SyncError;
use crate::types::{PeerSource, SyncConfig};

/// Last resolved peer address and its health
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceAddressCache {
    /// Most recent address; kept after invalidation so a later lookup can
    /// tell whether the peer moved
    pub address: Option<SocketAddr>,
    /// Whether `address` may be used without a fresh lookup
    pub valid: bool,
    /// Failures since the last successful lookup or invalidation
    pub consecutive_failures: u32,
}

impl ServiceAddressCache {
    /// Address usable without a lookup, if any
    #[must_use]
    pub fn usable(&self) -> Option<SocketAddr> {
        if self.valid { self.address } else { None }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Outcome of [`PeerLocator::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Address to probe
    pub address: SocketAddr,
    /// True when a lookup produced an address different from the previous one
    pub changed: bool,
}

/// Resolves the reference peer with caching, throttling and
/// failure-driven invalidation.
#[derive(Debug)]
pub struct PeerLocator {
    resolver: Arc<dyn Resolver>,
    source: PeerSource,
    cache: ServiceAddressCache,
    max_failures: u32,
    retry_interval: Duration,
    resolution_timeout: Duration,
    last_attempt: Option<Instant>,
}

impl PeerLocator {
    /// Create a locator for `config.peer`
    #[must_use]
    pub fn new(resolver: Arc<dyn Resolver>, config: &SyncConfig) -> Self {
        Self {
            resolver,
            source: config.peer.clone(),
            cache: ServiceAddressCache::default(),
            max_failures: config.max_consecutive_failures,
            retry_interval: config.resolution_retry_interval,
            resolution_timeout: config.resolution_timeout,
            last_attempt: None,
        }
    }

    /// Return the peer address, looking it up when the cache is not valid.
    ///
    /// A valid cached address is returned without network traffic. Otherwise
    /// at most one lookup is made per retry interval.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionThrottled` while the retry interval since the last
    /// lookup has not elapsed, or the resolver's error if the lookup fails.
    pub async fn resolve(&mut self) -> Result<Resolved, SyncError> {
        if let Some(address) = self.cache.usable() {
            return Ok(Resolved {
                address,
                changed: false,
            });
        }

        let now = Instant::now();
        if let Some(last) = self.last_attempt {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.retry_interval {
                return Err(SyncError::ResolutionThrottled {
                    retry_in: self.retry_interval - elapsed,
                });
            }
        }
        self.last_attempt = Some(now);

        match self
            .resolver
            .resolve(&self.source, self.resolution_timeout)
            .await
        {
            Ok(address) => {
                let changed = self.cache.address != Some(address);
                if changed {
                    tracing::info!(
                        peer = %self.source,
                        %address,
                        previous = ?self.cache.address,
                        "Reference peer resolved"
                    );
                }
                self.cache = ServiceAddressCache {
                    address: Some(address),
                    valid: true,
                    consecutive_failures: 0,
                };
                Ok(Resolved { address, changed })
            }
            Err(e) => {
                tracing::warn!(peer = %self.source, error = %e, "Peer resolution failed");
                self.record_failure();
                Err(e)
            }
        }
    }

    /// Count a failure against the cached address; invalidates the cache
    /// once the threshold is reached.
    pub fn record_failure(&mut self) {
        self.cache.consecutive_failures = self.cache.consecutive_failures.saturating_add(1);
        tracing::debug!(
            failures = self.cache.consecutive_failures,
            max = self.max_failures,
            "Peer failure recorded"
        );

        if self.cache.valid && self.cache.consecutive_failures >= self.max_failures {
            self.cache.valid = false;
            self.cache.consecutive_failures = 0;
            tracing::warn!(
                address = ?self.cache.address,
                failures = self.max_failures,
                "Invalidated cached peer address after consecutive failures"
            );
        }
    }

    /// Clear the failure count after a successful exchange
    pub fn record_success(&mut self) {
        self.cache.consecutive_failures = 0;
    }

    /// Switch to a different peer source; the next `resolve` looks it up
    /// immediately.
    pub fn set_source(&mut self, source: PeerSource) {
        tracing::info!(from = %self.source, to = %source, "Reference peer source changed");
        self.source = source;
        self.cache.clear();
        self.last_attempt = None;
    }

    /// Valid cached address, if any
    #[must_use]
    pub fn cached_address(&self) -> Option<SocketAddr> {
        self.cache.usable()
    }

    /// Current cache contents
    #[must_use]
    pub fn cache(&self) -> &ServiceAddressCache {
        &self.cache
    }

    /// Configured peer source
    #[must_use]
    pub fn source(&self) -> &PeerSource {
        &self.source
    }
}
