//! Core types module

mod config;

#[cfg(test)]
mod tests;

pub use config::{
    DEFAULT_SERVICE_HOSTNAME, MAX_CONFIG_DURATION, NTP_PORT, PeerSource, SyncConfig, SyncConfigBuilder,
};
