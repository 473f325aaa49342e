//! In-process stand-ins for the clock, transport and resolver seams.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::clock::MonotonicClock;
use crate::discovery::Resolver;
use crate::error::SyncError;
use crate::probe::{Exchange, ProbeTransport};
use crate::protocol::ntp::{NtpTimestamp, TimeReply};
use crate::types::PeerSource;

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: AtomicI64,
}

impl ManualClock {
    /// Create a clock reading `start_us`
    #[must_use]
    pub fn new(start_us: i64) -> Self {
        Self {
            now_us: AtomicI64::new(start_us),
        }
    }

    /// Jump to `now_us`
    pub fn set(&self, now_us: i64) {
        self.now_us.store(now_us, Ordering::SeqCst);
    }

    /// Move forward by `delta_us`
    pub fn advance(&self, delta_us: i64) {
        self.now_us.fetch_add(delta_us, Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn now_micros(&self) -> i64 {
        self.now_us.load(Ordering::SeqCst)
    }
}

/// One scripted answer of [`ScriptedTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Well-formed reply producing exactly this round trip and offset
    Reply {
        /// Round-trip time in microseconds
        round_trip_us: i64,
        /// Offset in microseconds
        offset_us: i64,
    },
    /// Never answers; the engine's probe timeout fires
    Timeout,
    /// Socket error
    Error,
    /// Raw datagram returned as the reply
    Raw(Bytes),
}

impl ScriptedReply {
    /// Shorthand for [`ScriptedReply::Reply`]
    #[must_use]
    pub fn reply(round_trip_us: i64, offset_us: i64) -> Self {
        Self::Reply {
            round_trip_us,
            offset_us,
        }
    }
}

/// Transport that plays back a queue of replies, then repeats a fallback.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<ScriptedReply>>,
    fallback: Mutex<ScriptedReply>,
    peers: Mutex<Vec<SocketAddr>>,
    calls: AtomicUsize,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// Empty script; every exchange times out
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(ScriptedReply::Timeout),
            peers: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Script the next exchanges in order
    #[must_use]
    pub fn with_script(self, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        self.push_all(replies);
        self
    }

    /// Answer once the script is exhausted
    #[must_use]
    pub fn with_fallback(self, reply: ScriptedReply) -> Self {
        self.set_fallback(reply);
        self
    }

    /// Append to the script
    pub fn push_all(&self, replies: impl IntoIterator<Item = ScriptedReply>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(replies);
    }

    /// Replace the fallback answer
    pub fn set_fallback(&self, reply: ScriptedReply) {
        *self.fallback.lock().unwrap_or_else(PoisonError::into_inner) = reply;
    }

    /// Exchanges attempted so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Peer of every exchange attempted so far
    #[must_use]
    pub fn peers(&self) -> Vec<SocketAddr> {
        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next(&self) -> ScriptedReply {
        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        scripted.unwrap_or_else(|| {
            self.fallback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        })
    }
}

#[async_trait]
impl ProbeTransport for ScriptedTransport {
    async fn exchange(
        &self,
        peer: SocketAddr,
        request: &[u8],
        clock: &dyn MonotonicClock,
    ) -> Result<Exchange, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(peer);

        let sent_us = clock.now_micros();
        match self.next() {
            ScriptedReply::Reply {
                round_trip_us,
                offset_us,
            } => {
                let t3_us = sent_us + round_trip_us / 2 + offset_us;
                let transmit = NtpTimestamp::from_unix_micros(t3_us).ok_or_else(|| {
                    SyncError::InvalidParameter {
                        name: "offset_us".to_string(),
                        message: format!("{t3_us}us is not representable"),
                    }
                })?;
                Ok(Exchange {
                    reply: TimeReply::answering(request, transmit, transmit).encode(),
                    sent_us,
                    received_us: sent_us + round_trip_us,
                })
            }
            ScriptedReply::Timeout => std::future::pending().await,
            ScriptedReply::Error => Err(SyncError::Transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "scripted failure",
            ))),
            ScriptedReply::Raw(reply) => Ok(Exchange {
                reply,
                sent_us,
                received_us: sent_us,
            }),
        }
    }
}

/// Resolver that plays back lookup results, then repeats a fallback.
///
/// `None` entries fail the lookup.
#[derive(Debug)]
pub struct ScriptedResolver {
    script: Mutex<VecDeque<Option<SocketAddr>>>,
    fallback: Mutex<Option<SocketAddr>>,
    lookups: Mutex<Vec<PeerSource>>,
}

impl ScriptedResolver {
    /// Resolver that always answers `address`
    #[must_use]
    pub fn fixed(address: SocketAddr) -> Self {
        Self::scripted([], Some(address))
    }

    /// Resolver that always fails
    #[must_use]
    pub fn failing() -> Self {
        Self::scripted([], None)
    }

    /// Play back `script`, then answer `fallback`
    #[must_use]
    pub fn scripted(
        script: impl IntoIterator<Item = Option<SocketAddr>>,
        fallback: Option<SocketAddr>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback: Mutex::new(fallback),
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Replace the fallback answer
    pub fn set_fallback(&self, address: Option<SocketAddr>) {
        *self.fallback.lock().unwrap_or_else(PoisonError::into_inner) = address;
    }

    /// Number of lookups performed
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Sources looked up so far, in order
    #[must_use]
    pub fn sources(&self) -> Vec<PeerSource> {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Resolver for ScriptedResolver {
    async fn resolve(
        &self,
        peer: &PeerSource,
        _timeout: Duration,
    ) -> Result<SocketAddr, SyncError> {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(peer.clone());

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let answer = match scripted {
            Some(answer) => answer,
            None => *self.fallback.lock().unwrap_or_else(PoisonError::into_inner),
        };

        answer.ok_or_else(|| SyncError::ResolutionFailed {
            host: peer.name().to_string(),
            message: "scripted failure".to_string(),
        })
    }
}
