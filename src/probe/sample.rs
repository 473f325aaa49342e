use crate::error::SyncError;

/// Offset and round-trip time measured by one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSample {
    /// Reference time minus local time at the exchange midpoint, in microseconds
    pub offset_us: i64,
    /// Local receive time minus local send time, in microseconds
    pub round_trip_us: i64,
}

impl ProbeSample {
    /// Build a sample from local send time `t1`, remote transmit time `t3`
    /// and local receive time `t4`.
    ///
    /// Server processing delay is taken as zero, so
    /// `offset = t3 - (t1 + t4) / 2` and `rtt = t4 - t1`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedReply` if `t4 < t1` or the arithmetic overflows.
    pub fn from_timestamps(t1_us: i64, t3_us: i64, t4_us: i64) -> Result<Self, SyncError> {
        let overflow = || SyncError::MalformedReply {
            message: format!("timestamps out of range: t1={t1_us} t3={t3_us} t4={t4_us}"),
        };

        let round_trip_us = t4_us.checked_sub(t1_us).ok_or_else(overflow)?;
        if round_trip_us < 0 {
            return Err(SyncError::MalformedReply {
                message: format!("negative round trip: {round_trip_us}us"),
            });
        }
        let midpoint_us = t1_us.checked_add(round_trip_us / 2).ok_or_else(overflow)?;
        let offset_us = t3_us.checked_sub(midpoint_us).ok_or_else(overflow)?;

        Ok(Self {
            offset_us,
            round_trip_us,
        })
    }
}

/// Pick the sample with the smallest round trip; the earliest wins ties.
///
/// The least-delayed exchange is the one least distorted by queuing, so
/// its offset best approximates a symmetric path.
pub fn select_min_rtt<I>(samples: I) -> Option<ProbeSample>
where
    I: IntoIterator<Item = ProbeSample>,
{
    samples.into_iter().fold(None, |best, sample| match best {
        Some(b) if b.round_trip_us <= sample.round_trip_us => Some(b),
        _ => Some(sample),
    })
}
