//! Fixed-size request/reply datagrams.

use bytes::{BufMut, Bytes, BytesMut};

use super::timestamp::NtpTimestamp;
use crate::error::SyncError;

/// Size of both request and reply datagrams
pub const NTP_PACKET_SIZE: usize = 48;

/// LI=0, VN=4, Mode=3 (client)
pub const CLIENT_MODE_FLAGS: u8 = 0x23;

/// LI=0, VN=4, Mode=4 (server)
pub const SERVER_MODE_FLAGS: u8 = 0x24;

const ORIGINATE_OFFSET: usize = 24;
const RECEIVE_OFFSET: usize = 32;
const TRANSMIT_OFFSET: usize = 40;

/// Client request packet
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeRequest;

impl TimeRequest {
    /// Encode to bytes. Everything but the version/mode byte is zero.
    #[must_use]
    pub fn encode(&self) -> [u8; NTP_PACKET_SIZE] {
        let mut buf = [0u8; NTP_PACKET_SIZE];
        buf[0] = CLIENT_MODE_FLAGS;
        buf
    }
}

/// Server reply packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeReply {
    /// Copy of the request's transmit field
    pub originate_time: NtpTimestamp,
    /// Time server received the request (T2)
    pub receive_time: NtpTimestamp,
    /// Time server sent this reply (T3)
    pub transmit_time: NtpTimestamp,
}

impl TimeReply {
    /// Decode a reply.
    ///
    /// # Errors
    ///
    /// Returns `MalformedReply` unless the buffer is exactly
    /// [`NTP_PACKET_SIZE`] bytes and carries a non-zero transmit timestamp.
    pub fn decode(buf: &[u8]) -> Result<Self, SyncError> {
        if buf.len() != NTP_PACKET_SIZE {
            return Err(SyncError::MalformedReply {
                message: format!("expected {NTP_PACKET_SIZE} bytes, got {}", buf.len()),
            });
        }

        let field = |offset: usize| {
            NtpTimestamp::decode(&buf[offset..offset + 8]).ok_or_else(|| {
                SyncError::MalformedReply {
                    message: format!("truncated timestamp at byte {offset}"),
                }
            })
        };

        let transmit_time = field(TRANSMIT_OFFSET)?;
        if transmit_time.is_zero() {
            return Err(SyncError::MalformedReply {
                message: "zero transmit timestamp".to_string(),
            });
        }

        Ok(Self {
            originate_time: field(ORIGINATE_OFFSET)?,
            receive_time: field(RECEIVE_OFFSET)?,
            transmit_time,
        })
    }

    /// Transmit timestamp (T3) as Unix microseconds
    ///
    /// # Errors
    ///
    /// Returns `MalformedReply` if the timestamp does not convert without overflow.
    pub fn transmit_micros(&self) -> Result<i64, SyncError> {
        self.transmit_time
            .to_unix_micros()
            .ok_or_else(|| SyncError::MalformedReply {
                message: format!("transmit timestamp {} out of range", self.transmit_time),
            })
    }

    /// Encode to bytes (server side)
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(NTP_PACKET_SIZE);
        buf.put_u8(SERVER_MODE_FLAGS);
        buf.put_u8(1); // Stratum 1
        buf.put_u8(0); // Poll
        buf.put_i8(-20); // Precision, ~1us
        buf.put_u32(0); // Root delay
        buf.put_u32(0); // Root dispersion
        buf.put_slice(b"LOCL"); // Reference ID
        buf.put_slice(&self.receive_time.encode()); // Reference time
        buf.put_slice(&self.originate_time.encode());
        buf.put_slice(&self.receive_time.encode());
        buf.put_slice(&self.transmit_time.encode());
        debug_assert_eq!(buf.len(), NTP_PACKET_SIZE);
        buf.freeze()
    }

    /// Reply to `request` stamped with the given receive/transmit times
    #[must_use]
    pub fn answering(
        request: &[u8],
        receive_time: NtpTimestamp,
        transmit_time: NtpTimestamp,
    ) -> Self {
        let originate_time = request
            .get(TRANSMIT_OFFSET..TRANSMIT_OFFSET + 8)
            .and_then(NtpTimestamp::decode)
            .unwrap_or_default();
        Self {
            originate_time,
            receive_time,
            transmit_time,
        }
    }
}
