//! Datagram transport for probe exchanges.

use std::fmt::Debug;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::clock::MonotonicClock;
use crate::error::SyncError;

/// Receive buffer; larger than a reply so oversized datagrams are seen as such.
const RECV_BUF_SIZE: usize = 128;

/// One completed request/reply exchange
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Raw reply datagram
    pub reply: Bytes,
    /// Local time taken immediately before sending (T1)
    pub sent_us: i64,
    /// Local time taken immediately after receiving (T4)
    pub received_us: i64,
}

/// Sends one request to the peer and waits for one reply.
///
/// Implementations stamp T1/T4 with `clock` as close to the wire as they
/// can. The caller bounds the call with the probe timeout.
#[async_trait]
pub trait ProbeTransport: Send + Sync + Debug {
    /// Perform a single exchange
    ///
    /// # Errors
    ///
    /// Returns `Transport` on socket failures.
    async fn exchange(
        &self,
        peer: SocketAddr,
        request: &[u8],
        clock: &dyn MonotonicClock,
    ) -> Result<Exchange, SyncError>;
}

/// UDP transport using a fresh ephemeral socket per exchange.
///
/// The socket is connected to the peer so datagrams from any other source
/// are dropped by the kernel instead of being taken as the reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpTransport;

impl UdpTransport {
    /// Create a new UDP transport
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProbeTransport for UdpTransport {
    async fn exchange(
        &self,
        peer: SocketAddr,
        request: &[u8],
        clock: &dyn MonotonicClock,
    ) -> Result<Exchange, SyncError> {
        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;

        let mut buf = [0u8; RECV_BUF_SIZE];
        let sent_us = clock.now_micros();
        socket.send(request).await?;
        let len = socket.recv(&mut buf).await?;
        let received_us = clock.now_micros();

        Ok(Exchange {
            reply: Bytes::copy_from_slice(&buf[..len]),
            sent_us,
            received_us,
        })
    }
}
