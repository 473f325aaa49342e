use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while synchronizing to the network time reference
#[derive(Debug, Error)]
pub enum SyncError {
    // ===== Resolution Errors =====
    /// Name lookup for the reference peer did not complete
    #[error("resolution failed for {host}: {message}")]
    ResolutionFailed {
        /// The logical host name that was looked up
        host: String,
        /// Description of the failure
        message: String,
    },

    /// A lookup was skipped because the previous attempt was too recent
    #[error("resolution throttled, next attempt in {retry_in:?}")]
    ResolutionThrottled {
        /// Time until the next lookup is allowed
        retry_in: Duration,
    },

    /// No usable peer address is cached
    #[error("no reference peer address available")]
    NoPeer,

    // ===== Transport Errors =====
    /// Socket send/receive error
    #[error("network error: {0}")]
    Transport(#[from] io::Error),

    /// No reply arrived within the probe timeout
    #[error("probe timed out after {duration:?}")]
    Timeout {
        /// The timeout that elapsed
        duration: Duration,
    },

    /// Reply had the wrong size or an undecodable timestamp
    #[error("malformed reply: {message}")]
    MalformedReply {
        /// Description of what was wrong
        message: String,
    },

    /// Every probe in a burst failed
    #[error("burst exhausted: no valid sample out of {attempts} probes")]
    BurstExhausted {
        /// Number of probes attempted
        attempts: usize,
    },

    // ===== Model Errors =====
    /// A conversion was requested before any sample was applied
    #[error("clock model not ready")]
    ModelNotReady,

    // ===== Service Errors =====
    /// The cadence loop is no longer running
    #[error("sync service stopped")]
    ServiceStopped,

    /// Invalid parameter provided
    #[error("invalid parameter: {name} - {message}")]
    InvalidParameter {
        /// The name of the parameter
        name: String,
        /// Description of the error
        message: String,
    },
}

impl SyncError {
    /// Check if retrying on a later cycle may succeed
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ServiceStopped | Self::InvalidParameter { .. })
    }

    /// Check if this error came from a single probe exchange
    #[must_use]
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::MalformedReply { .. }
        )
    }
}

/// Result type alias for clock synchronization operations
pub type Result<T> = std::result::Result<T, SyncError>;
