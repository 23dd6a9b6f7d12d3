//! Journal failure modes
//!
//! The journal keeps its own error enum; the bridge converts into the
//! core transport taxonomy at its boundary, where `Io` becomes the only
//! fatal condition.

use common::TransportError;
use thiserror::Error;

/// Everything that can go wrong on the journal
#[derive(Debug, Error)]
pub enum JournalError {
    /// Mmap, create or map failure; fatal once it reaches the core
    #[error("journal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Magic, version or size mismatch at open or create time
    #[error("unusable journal page: {0}")]
    InvalidPage(String),

    /// Payload exceeds what the page can ever carry; frame dropped
    #[error("frame of {len} bytes exceeds journal capacity {max}")]
    FrameTooLarge {
        /// Offending payload length
        len: usize,
        /// Maximum the page can carry
        max: usize,
    },

    /// Reader overrun by a wrapping writer; consumer chooses recovery
    #[error("reader lagged: expected seq {expected}, found {found}")]
    Lag {
        /// Sequence the reader expected next
        expected: u64,
        /// Sequence actually observed
        found: u64,
    },

    /// Frame header or payload does not decode
    #[error("corrupt frame data: {0}")]
    Corrupt(String),
}

impl From<JournalError> for TransportError {
    fn from(err: JournalError) -> Self {
        match err {
            JournalError::Io(e) => Self::FatalIo(e),
            JournalError::InvalidPage(msg) | JournalError::Corrupt(msg) => Self::Protocol(msg),
            JournalError::FrameTooLarge { len, max } => Self::FrameTooLarge { len, max },
            JournalError::Lag { expected, found } => Self::JournalLag { expected, found },
        }
    }
}
