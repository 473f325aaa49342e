//! Minimal reference-time protocol client exchange.
//!
//! Only the fields needed to recover one remote timestamp per probe are
//! modelled: the client sends a fixed 48-byte request with the
//! version/mode byte set, and reads the Transmit Timestamp (T3) from the
//! 48-byte reply.
//!
//! ```text
//! Client                          Server
//!   |--- request (T1 local) ------->|
//!   |<---- reply carrying T3 -------|  (client records T4)
//!   |                               |
//!   |  offset = T3 - (T1 + T4) / 2  |
//!   |  RTT    = T4 - T1             |
//! ```

pub mod packet;
pub mod timestamp;

#[cfg(test)]
mod tests;

pub use packet::{
    CLIENT_MODE_FLAGS, NTP_PACKET_SIZE, SERVER_MODE_FLAGS, TimeReply, TimeRequest,
};
pub use timestamp::NtpTimestamp;
