//! Cadence scheduler: the background loop that resolves the reference
//! peer, runs bursts on an adaptive schedule and feeds the clock model.
//!
//! The schedule starts with fast bursts (the lock phase) and slows down
//! once enough bursts have succeeded. A changed peer address discards the
//! model and starts the lock phase over.

mod cadence;
mod service;

#[cfg(test)]
mod tests;

pub use cadence::{CadencePhase, CadenceState};
pub use service::{ClockSyncHandle, ClockSyncService, SyncStatus};
