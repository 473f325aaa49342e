//! Mock reference time server for testing purposes.
//!
//! Answers 48-byte client requests on a loopback UDP socket with replies
//! stamped from the system clock shifted by a configurable offset. An
//! optional [`NetworkSimulator`] drops and delays replies.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use super::network_sim::NetworkSimulator;
use crate::protocol::ntp::{NTP_PACKET_SIZE, NtpTimestamp, TimeReply};

/// Configuration for the mock time server.
#[derive(Debug, Clone)]
pub struct MockTimeServerConfig {
    /// Address to bind (use port 0 for an ephemeral port).
    pub bind_addr: SocketAddr,
    /// Added to the system clock when stamping replies, in microseconds.
    pub offset_us: i64,
    /// Simulated network conditions applied to replies.
    pub network: NetworkSimulator,
    /// Truncate replies to this many bytes (to provoke malformed replies).
    pub reply_len: usize,
}

impl Default for MockTimeServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            offset_us: 0,
            network: NetworkSimulator::perfect(),
            reply_len: NTP_PACKET_SIZE,
        }
    }
}

/// A mock time server.
pub struct MockTimeServer {
    config: MockTimeServerConfig,
    /// Offset shared with the server task so tests can step the reference.
    offset_us: Arc<AtomicI64>,
    /// Number of requests received.
    requests: Arc<AtomicUsize>,
    /// Channel to signal shutdown to the server task.
    shutdown: Option<mpsc::Sender<()>>,
    /// The local address the server is listening on.
    address: Option<SocketAddr>,
}

impl MockTimeServer {
    /// Creates a new server with the specified configuration.
    #[must_use]
    pub fn new(config: MockTimeServerConfig) -> Self {
        Self {
            offset_us: Arc::new(AtomicI64::new(config.offset_us)),
            config,
            requests: Arc::new(AtomicUsize::new(0)),
            shutdown: None,
            address: None,
        }
    }

    /// Creates a server on an ephemeral loopback port with the given offset.
    #[must_use]
    pub fn with_offset(offset_us: i64) -> Self {
        Self::new(MockTimeServerConfig {
            offset_us,
            ..MockTimeServerConfig::default()
        })
    }

    /// Starts the server.
    ///
    /// Returns the socket address the server is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the UDP socket cannot be bound.
    pub async fn start(&mut self) -> Result<SocketAddr, std::io::Error> {
        let socket = UdpSocket::bind(self.config.bind_addr).await?;
        let addr = socket.local_addr()?;
        self.address = Some(addr);

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        self.shutdown = Some(shutdown_tx);

        let socket = Arc::new(socket);
        let offset_us = Arc::clone(&self.offset_us);
        let requests = Arc::clone(&self.requests);
        let network = self.config.network.clone();
        let reply_len = self.config.reply_len;

        tokio::spawn(async move {
            let mut buf = [0u8; 256];
            loop {
                tokio::select! {
                    result = socket.recv_from(&mut buf) => {
                        let (len, src) = match result {
                            Ok(r) => r,
                            Err(e) => {
                                tracing::error!("Mock time server receive error: {}", e);
                                continue;
                            }
                        };
                        requests.fetch_add(1, Ordering::Relaxed);

                        if network.should_drop() {
                            continue;
                        }
                        let receive_time = stamp(offset_us.load(Ordering::Relaxed));
                        let delay = network.get_delay();
                        let request = buf[..len].to_vec();
                        let socket = Arc::clone(&socket);
                        let offset_us = Arc::clone(&offset_us);

                        tokio::spawn(async move {
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                            let transmit_time = stamp(offset_us.load(Ordering::Relaxed));
                            let reply = TimeReply::answering(&request, receive_time, transmit_time).encode();
                            let len = reply_len.min(reply.len());
                            if let Err(e) = socket.send_to(&reply[..len], src).await {
                                tracing::warn!("Mock time server send error: {}", e);
                            }
                        });
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Ok(addr)
    }

    /// Stops the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(()).await;
        }
    }

    /// Returns the address the server is listening on.
    #[must_use]
    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    /// Returns the number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Change the reference offset for subsequent replies.
    pub fn set_offset(&self, offset_us: i64) {
        self.offset_us.store(offset_us, Ordering::Relaxed);
    }
}

fn stamp(offset_us: i64) -> NtpTimestamp {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    let micros = i64::try_from(now.as_micros()).unwrap_or(i64::MAX);
    NtpTimestamp::from_unix_micros(micros.saturating_add(offset_us)).unwrap_or(NtpTimestamp::ZERO)
}

impl Drop for MockTimeServer {
    fn drop(&mut self) {
        // Trigger shutdown
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.try_send(());
        }
    }
}
