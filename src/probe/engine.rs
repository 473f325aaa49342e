use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use super::sample::{ProbeSample, select_min_rtt};
use super::transport::ProbeTransport;
use crate::clock::MonotonicClock;
use crate::error::SyncError;
use crate::protocol::ntp::{TimeReply, TimeRequest};
use crate::types::SyncConfig;

/// Executes timestamp exchanges against the reference peer
#[derive(Debug, Clone)]
pub struct ProbeEngine {
    transport: Arc<dyn ProbeTransport>,
    clock: Arc<dyn MonotonicClock>,
    burst_size: usize,
    probe_timeout: Duration,
    inter_probe_delay: Duration,
}

impl ProbeEngine {
    /// Create an engine with the burst parameters from `config`
    #[must_use]
    pub fn new(
        transport: Arc<dyn ProbeTransport>,
        clock: Arc<dyn MonotonicClock>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            transport,
            clock,
            burst_size: config.burst_size,
            probe_timeout: config.probe_timeout,
            inter_probe_delay: config.inter_probe_delay,
        }
    }

    /// Probes per burst
    #[must_use]
    pub fn burst_size(&self) -> usize {
        self.burst_size
    }

    /// Perform one exchange and derive offset and RTT from it.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if no reply arrives within the probe timeout,
    /// `Transport` on socket errors and `MalformedReply` if the reply is
    /// not a well-formed fixed-size packet.
    pub async fn probe_once(&self, peer: SocketAddr) -> Result<ProbeSample, SyncError> {
        let request = TimeRequest.encode();
        let exchange = tokio::time::timeout(
            self.probe_timeout,
            self.transport.exchange(peer, &request, self.clock.as_ref()),
        )
        .await
        .map_err(|_| SyncError::Timeout {
            duration: self.probe_timeout,
        })??;

        let reply = TimeReply::decode(&exchange.reply)?;
        let t3_us = reply.transmit_micros()?;
        ProbeSample::from_timestamps(exchange.sent_us, t3_us, exchange.received_us)
    }

    /// Run a burst and return its minimum-RTT sample.
    ///
    /// Probes are spaced by the inter-probe delay; individual failures are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `BurstExhausted` if no probe in the burst produced a sample.
    pub async fn probe_burst(&self, peer: SocketAddr) -> Result<ProbeSample, SyncError> {
        let mut samples = Vec::with_capacity(self.burst_size);

        for i in 0..self.burst_size {
            match self.probe_once(peer).await {
                Ok(sample) => samples.push(sample),
                Err(e) => tracing::trace!(%peer, probe = i, error = %e, "Probe failed"),
            }

            if i + 1 < self.burst_size {
                tokio::time::sleep(self.inter_probe_delay).await;
            }
        }

        let valid = samples.len();
        let best = select_min_rtt(samples).ok_or(SyncError::BurstExhausted {
            attempts: self.burst_size,
        })?;

        tracing::debug!(
            %peer,
            valid,
            attempted = self.burst_size,
            rtt_us = best.round_trip_us,
            offset_us = best.offset_us,
            "Probe burst complete"
        );
        Ok(best)
    }
}
