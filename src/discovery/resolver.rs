use std::fmt::{self, Debug};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::PeerSource;

/// Name resolution collaborator: maps a [`PeerSource`] to a socket address.
#[async_trait]
pub trait Resolver: Send + Sync + Debug {
    /// Look up the peer
    ///
    /// # Errors
    ///
    /// Returns `ResolutionFailed` if no address was found within `timeout`.
    async fn resolve(&self, peer: &PeerSource, timeout: Duration)
    -> Result<SocketAddr, SyncError>;
}

/// Resolver backed by multicast DNS (`mdns` feature) and the system's
/// unicast resolver.
#[derive(Default)]
pub struct SystemResolver {
    #[cfg(feature = "mdns")]
    daemon: std::sync::Mutex<Option<mdns_sd::ServiceDaemon>>,
}

impl fmt::Debug for SystemResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemResolver")
            .field("mdns", &cfg!(feature = "mdns"))
            .finish_non_exhaustive()
    }
}

impl SystemResolver {
    /// Create a resolver; the mDNS daemon is started on first use
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn resolve_host(
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<SocketAddr, SyncError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, port));
        }

        let failed = |message: String| SyncError::ResolutionFailed {
            host: host.to_string(),
            message,
        };

        let lookup = tokio::net::lookup_host((host, port));
        let addrs: Vec<SocketAddr> = tokio::time::timeout(timeout, lookup)
            .await
            .map_err(|_| failed(format!("timed out after {timeout:?}")))?
            .map_err(|e| failed(e.to_string()))?
            .collect();

        prefer_ipv4(addrs.iter().map(SocketAddr::ip))
            .map(|ip| SocketAddr::new(ip, port))
            .ok_or_else(|| failed("no addresses returned".to_string()))
    }

    #[cfg(feature = "mdns")]
    fn daemon(&self) -> Result<mdns_sd::ServiceDaemon, SyncError> {
        let mut guard = self
            .daemon
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(daemon) = guard.as_ref() {
            return Ok(daemon.clone());
        }
        let daemon = mdns_sd::ServiceDaemon::new().map_err(|e| SyncError::ResolutionFailed {
            host: "mdns".to_string(),
            message: format!("Failed to create mDNS daemon: {e}"),
        })?;
        *guard = Some(daemon.clone());
        Ok(daemon)
    }

    #[cfg(feature = "mdns")]
    async fn resolve_mdns(
        &self,
        hostname: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<SocketAddr, SyncError> {
        use mdns_sd::HostnameResolutionEvent;

        let fqdn = mdns_hostname(hostname);
        let failed = |message: String| SyncError::ResolutionFailed {
            host: fqdn.clone(),
            message,
        };

        let daemon = self.daemon()?;
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let receiver = daemon
            .resolve_hostname(&fqdn, Some(timeout_ms))
            .map_err(|e| failed(format!("Failed to query: {e}")))?;

        let deadline = tokio::time::Instant::now() + timeout;
        let result = loop {
            match tokio::time::timeout_at(deadline, receiver.recv_async()).await {
                Ok(Ok(HostnameResolutionEvent::AddressesFound(_, addrs))) => {
                    if let Some(ip) = prefer_ipv4(addrs.into_iter()) {
                        break Ok(SocketAddr::new(ip, port));
                    }
                }
                Ok(Ok(HostnameResolutionEvent::SearchTimeout(_))) | Err(_) => {
                    break Err(failed(format!("no answer within {timeout:?}")));
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => break Err(failed(format!("query channel closed: {e}"))),
            }
        };

        let _ = daemon.stop_resolve_hostname(&fqdn);
        result
    }
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(
        &self,
        peer: &PeerSource,
        timeout: Duration,
    ) -> Result<SocketAddr, SyncError> {
        match peer {
            PeerSource::Host { host, port } => Self::resolve_host(host, *port, timeout).await,
            #[cfg(feature = "mdns")]
            PeerSource::Mdns { hostname, port } => {
                self.resolve_mdns(hostname, *port, timeout).await
            }
            #[cfg(not(feature = "mdns"))]
            PeerSource::Mdns { hostname, .. } => Err(SyncError::ResolutionFailed {
                host: mdns_hostname(hostname),
                message: "mDNS support not compiled in".to_string(),
            }),
        }
    }
}

#[cfg(feature = "mdns")]
impl Drop for SystemResolver {
    fn drop(&mut self) {
        let daemon = self
            .daemon
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(daemon) = daemon {
            let _ = daemon.shutdown();
        }
    }
}

/// Fully qualified mDNS host name: `screamrouter` becomes `screamrouter.local.`
#[must_use]
pub fn mdns_hostname(hostname: &str) -> String {
    let trimmed = hostname.trim_end_matches('.');
    let base = trimmed.strip_suffix(".local").unwrap_or(trimmed);
    format!("{base}.local.")
}

/// First IPv4 address, else the first address of any family
pub(crate) fn prefer_ipv4(addrs: impl Iterator<Item = IpAddr>) -> Option<IpAddr> {
    let mut first = None;
    for ip in addrs {
        if ip.is_ipv4() {
            return Some(ip);
        }
        first.get_or_insert(ip);
    }
    first
}
