//! Probe engine: single timestamp exchanges and minimum-RTT bursts.

mod engine;
mod sample;
mod transport;

#[cfg(test)]
mod tests;

pub use engine::ProbeEngine;
pub use sample::{ProbeSample, select_min_rtt};
pub use transport::{Exchange, ProbeTransport, UdpTransport};
