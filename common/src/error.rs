//! Error taxonomy shared by every crate in the core
//!
//! Policy per variant: transient network and rate limits retry with
//! backoff, auth failures stop the session, protocol errors drop the
//! offending message, journal conditions surface to the consumer, and
//! only `FatalIo` may take the process down.

use thiserror::Error;

/// The core error taxonomy
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket reset, timeout, DNS flake; retried with backoff
    #[error("transient network failure: {0}")]
    TransientNetwork(String),

    /// Signature, timestamp or key invalid; session stops
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// Unparseable frame or unknown channel; message dropped
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Venue rejected for rate; apply suggested backoff
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Venue-suggested backoff
        retry_after_ms: u64,
    },

    /// Journal payload exceeds the page capacity; frame dropped
    #[error("frame of {len} bytes exceeds journal capacity {max}")]
    FrameTooLarge {
        /// Offending payload length
        len: usize,
        /// Maximum the page can carry
        max: usize,
    },

    /// Reader overrun by a wrapping writer; consumer chooses recovery
    #[error("journal reader lagged: expected seq {expected}, found {found}")]
    JournalLag {
        /// Sequence the reader expected next
        expected: u64,
        /// Sequence actually observed
        found: u64,
    },

    /// Order update contradicts the lifecycle model; update dropped
    #[error("order state machine violation: {0}")]
    StateMachineViolation(String),

    /// Mmap, fd exhaustion, OOM; propagates and terminates the process
    #[error("fatal I/O: {0}")]
    FatalIo(#[from] std::io::Error),
}

impl TransportError {
    /// Whether the session should retry after this error
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork(_) | Self::RateLimited { .. }
        )
    }

    /// Whether the error terminates the owning session permanently
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::AuthFailure(_) | Self::FatalIo(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy() {
        assert!(TransportError::TransientNetwork("reset".into()).is_retryable());
        assert!(TransportError::RateLimited { retry_after_ms: 100 }.is_retryable());
        assert!(!TransportError::AuthFailure("bad key".into()).is_retryable());
        assert!(TransportError::AuthFailure("bad key".into()).is_terminal());
        assert!(!TransportError::Protocol("unknown channel".into()).is_terminal());
    }
}
