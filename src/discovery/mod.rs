//! Reference peer discovery
//!
//! [`PeerLocator`] keeps the last resolved address of the time reference and
//! only goes back to the [`Resolver`] when that address has been invalidated
//! by repeated failures or the peer source changes.

mod locator;
mod resolver;

pub use locator::{PeerLocator, Resolved, ServiceAddressCache};
pub use resolver::{Resolver, SystemResolver, mdns_hostname};
