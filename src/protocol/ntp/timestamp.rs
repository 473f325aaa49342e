//! NTP 64-bit timestamp: 32-bit seconds since 1900-01-01 + 32-bit fraction.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// NTP timestamp (64-bit, seconds since 1900-01-01)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NtpTimestamp {
    /// Seconds since NTP epoch
    pub seconds: u32,
    /// Fractional seconds (1/2^32 of a second)
    pub fraction: u32,
}

impl NtpTimestamp {
    /// NTP epoch offset from Unix epoch (70 years in seconds)
    pub const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

    /// Seconds in one 32-bit NTP era
    const ERA_SECONDS: i64 = 1 << 32;

    /// Zero timestamp, sent by servers that have never synchronized.
    pub const ZERO: Self = Self {
        seconds: 0,
        fraction: 0,
    };

    /// Create from current system time
    #[must_use]
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        let micros = i64::try_from(duration.as_micros()).unwrap_or(i64::MAX);
        Self::from_unix_micros(micros).unwrap_or(Self::ZERO)
    }

    /// Encode to 8 bytes
    #[must_use]
    pub fn encode(&self) -> [u8; 8] {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&self.seconds.to_be_bytes());
        buf[4..8].copy_from_slice(&self.fraction.to_be_bytes());
        buf
    }

    /// Decode from 8 bytes
    ///
    /// Returns `None` if the slice is too short.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        let bytes: &[u8; 8] = buf.get(0..8)?.try_into().ok()?;
        Some(Self {
            seconds: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            fraction: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    /// Whether this is the all-zero "unsynchronized" timestamp
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.seconds == 0 && self.fraction == 0
    }

    /// Convert to microseconds since the Unix epoch.
    ///
    /// Seconds with the most significant bit clear are taken to be in era 1
    /// (after 2036-02-07), so the result stays correct across the rollover.
    /// Returns `None` for the zero timestamp.
    #[must_use]
    pub fn to_unix_micros(&self) -> Option<i64> {
        if self.is_zero() {
            return None;
        }
        let mut ntp_seconds = i64::from(self.seconds);
        if self.seconds & 0x8000_0000 == 0 {
            ntp_seconds = ntp_seconds.checked_add(Self::ERA_SECONDS)?;
        }
        let unix_seconds = ntp_seconds.checked_sub(Self::NTP_UNIX_OFFSET)?;
        // Round to the nearest microsecond so encode/decode is lossless.
        let frac_micros = (u64::from(self.fraction) * 1_000_000 + (1 << 31)) >> 32;
        unix_seconds
            .checked_mul(1_000_000)?
            .checked_add(i64::try_from(frac_micros).ok()?)
    }

    /// Create from microseconds since the Unix epoch.
    ///
    /// Returns `None` if the instant does not fit in eras 0 or 1.
    #[must_use]
    pub fn from_unix_micros(micros: i64) -> Option<Self> {
        let unix_seconds = micros.div_euclid(1_000_000);
        let sub_micros = u64::try_from(micros.rem_euclid(1_000_000)).ok()?;
        let ntp_seconds = unix_seconds.checked_add(Self::NTP_UNIX_OFFSET)?;
        if !(0..2 * Self::ERA_SECONDS).contains(&ntp_seconds) {
            return None;
        }
        let seconds = u32::try_from(ntp_seconds.rem_euclid(Self::ERA_SECONDS)).ok()?;
        let fraction = u32::try_from((sub_micros << 32) / 1_000_000).ok()?;
        Some(Self { seconds, fraction })
    }
}

impl std::fmt::Display for NtpTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:08x}", self.seconds, self.fraction)
    }
}
