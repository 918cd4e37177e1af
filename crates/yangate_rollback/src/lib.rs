//! # Yangate Rollback
//!
//! The durable, append-only rollback log: one record per committed
//! transaction, retrievable by ID and enumerable in commit order.
//!
//! ## Record format
//!
//! ```text
//! | magic (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! ## Durability contract
//!
//! - Append is the only mutation; records are never modified.
//! - A record is flushed to the store before the append returns, so nothing
//!   is ever acknowledged that could not be recovered.
//! - Transaction IDs are allocated at append time from a counter recovered
//!   off the log itself, so they stay strictly increasing across restarts
//!   and a failed append consumes no ID.
//!
//! ## Recovery policy
//!
//! Opening the log scans it once, streaming. A truncated final record
//! (crash mid-append, before the flush) is tolerated and treated as clean
//! end-of-log. CRC mismatches, bad magic bytes, unknown record types, and
//! future format versions are corruption and abort the open: the log must
//! not silently lose history.
//!
//! Besides commits, the log carries two marker record types that make
//! confirmed commits survive restarts: `PendingArm` records an armed
//! confirmation window (with its revert target), `Resolve` records that the
//! window was closed, by confirmation or by the recorded reversion. An
//! unresolved `PendingArm` found during the open scan is surfaced to the
//! engine, which decides whether the deadline already passed.

mod error;
mod log;
mod record;
mod store;

pub use error::{LogError, LogResult};
pub use log::{CommitSummary, PendingMarker, RollbackLog};
pub use record::{
    compute_crc32, CommitRecord, LogRecord, OperationKind, RecordType, LOG_MAGIC, LOG_VERSION,
};
pub use store::{FileStore, LogStore, MemStore};
