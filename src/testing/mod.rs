//! Test doubles for the engine's clock, transport and resolver seams, and a
//! loopback time server for end-to-end runs.

mod fakes;
pub mod mock_time_server;
pub mod network_sim;

pub use fakes::{ManualClock, ScriptedReply, ScriptedResolver, ScriptedTransport};
pub use mock_time_server::{MockTimeServer, MockTimeServerConfig};
pub use network_sim::NetworkSimulator;
