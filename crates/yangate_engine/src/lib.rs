//! # Yangate Engine
//!
//! The transaction engine at the heart of the northbound server: it owns
//! the running configuration, serializes all mutation through a two-phase
//! commit state machine, and drives confirmed-commit auto-reversion.
//!
//! ## Commit protocol
//!
//! Phase 1 computes the candidate tree (merge, replace, or change patch)
//! against the running configuration as of entry into the commit critical
//! section and validates it; failure leaves no trace. Phase 2 appends a
//! durable record to the rollback log (which allocates the transaction ID)
//! and swaps the running tree pointer. Readers take `Arc` snapshots and can
//! never observe a half-applied configuration.
//!
//! ## Confirmed commits
//!
//! A commit with a confirmation timeout applies immediately but arms a
//! countdown; unless it is confirmed (explicitly or by a follow-up commit
//! with no timeout) the engine reverts to the pre-window configuration and
//! records the reversion as its own auditable transaction. Windows survive
//! restarts: expiry during downtime is resolved at open, before any
//! request is served.

mod config;
mod engine;
mod error;
mod timer;
mod view;

pub use config::{EngineConfig, PendingCommitPolicy};
pub use engine::{
    unix_now_ns, CommitOutcome, CommitPayload, CommitRequest, ConfigEngine, PendingCommit,
    Transaction,
};
pub use error::{EngineError, EngineResult};
pub use view::DataType;

// Callers of `list_transactions` and log-level types.
pub use yangate_rollback::{CommitSummary, OperationKind};
