//! # netclock
//!
//! Network clock synchronization for devices that must play audio in step
//! with the rest of the network.
//!
//! ## Features
//!
//! - Reference peer lookup via mDNS or unicast DNS, with caching
//! - Minimal 48-byte NTP client exchange, bursts with minimum-RTT selection
//! - Software PLL tracking offset and rate between the local monotonic
//!   clock and the network reference
//! - Lock-free-to-readers conversion API for the audio pipeline
//!
//! ## Example
//!
//! ```rust,no_run
//! use netclock::{ClockSyncService, PeerSource, SyncConfig};
//!
//! # async fn example() -> Result<(), netclock::SyncError> {
//! let config = SyncConfig::builder()
//!     .peer(PeerSource::mdns("screamrouter"))
//!     .build();
//! let handle = ClockSyncService::start(&config)?;
//!
//! let clock = handle.reader();
//! if let Ok(master) = clock.now_master() {
//!     // Schedule a frame 20ms from now on the shared timeline
//!     let play_at = clock.master_to_local(master + 20_000)?;
//!     println!("play at local {play_at}us");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Scheduler**: [`ClockSyncService`] runs the adaptive burst schedule and
//!   is the only writer of the model
//! - **Clock**: [`ClockReader`] is the read side handed to consumers
//! - **Probe / discovery**: bursts against the peer found by the locator
//! - **Protocol**: the wire format of one exchange

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

pub mod clock;
pub mod discovery;
pub mod probe;
pub mod protocol;
pub mod scheduler;

// Re-exports
pub use clock::{ClockReader, ClockSnapshot, ClockState, ConvergenceStatus, MonotonicClock};
pub use discovery::{Resolver, SystemResolver};
pub use error::{Result, SyncError};
pub use probe::{ProbeSample, ProbeTransport, UdpTransport};
pub use scheduler::{CadencePhase, ClockSyncHandle, ClockSyncService, SyncStatus};
pub use types::{PeerSource, SyncConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        ClockReader, ClockState, ClockSyncHandle, ClockSyncService, PeerSource, SyncConfig,
        SyncError,
    };
}
