//! Error types for the rollback log.

use std::io;
use thiserror::Error;

/// Result type for rollback log operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur in rollback log operations.
#[derive(Debug, Error)]
pub enum LogError {
    /// An I/O error from the underlying store.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of the store.
    #[error("read beyond end of log: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// Requested read offset.
        offset: u64,
        /// Requested read length.
        len: usize,
        /// Current store size.
        size: u64,
    },

    /// The log file is held by another process.
    #[error("rollback log locked: another process has exclusive access")]
    Locked,

    /// The log contains structurally invalid data.
    #[error("rollback log corruption: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    /// A record's stored checksum does not match its contents.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the corrupt record.
        offset: u64,
        /// Checksum stored in the record.
        expected: u32,
        /// Checksum computed over the record.
        actual: u32,
    },

    /// The log was written by a future format version.
    #[error("unsupported rollback log version {found}")]
    UnsupportedVersion {
        /// Version found in the log.
        found: u16,
    },

    /// No committed transaction has the requested ID.
    #[error("transaction {txid} not found in rollback log")]
    NotFound {
        /// The requested transaction ID.
        txid: u64,
    },

    /// The transaction ID space is exhausted.
    #[error("transaction ID space exhausted")]
    IdExhausted,
}

impl LogError {
    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }
}
