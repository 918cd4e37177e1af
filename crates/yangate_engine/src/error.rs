//! Engine error types.

use yangate_rollback::LogError;
use yangate_schema::{SchemaError, ValidationError};
use yangate_tree::{ParseError, PatchError};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the transaction engine.
///
/// The variants follow the failure domains a caller has to tell apart:
/// validation-class failures never left any visible change, resource-class
/// failures aborted before the running configuration advanced, and
/// `TransactionNotFound` / `ModuleNotFound` are lookup misses.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Schema registry failure (module load, resolution).
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Malformed wire payload for the declared encoding.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A candidate tree violated schema constraints.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A change-patch step failed; carries the failing op index.
    #[error("patch error: {0}")]
    Patch(#[from] PatchError),

    /// Transaction ID space or rollback log storage exhausted.
    #[error("resource error: {message}")]
    Resource {
        /// What was exhausted or failed.
        message: String,
    },

    /// The requested transaction is not in the rollback log.
    #[error("transaction {txid} not found")]
    TransactionNotFound {
        /// The requested ID.
        txid: u64,
    },

    /// A malformed request that is not a payload parse failure, such as a
    /// bad path or an execute body without exactly one invocation.
    #[error("invalid request: {message}")]
    Request {
        /// What was wrong with the request.
        message: String,
    },

    /// A commit was rejected because a confirmation window is open and the
    /// engine policy is [`PendingCommitPolicy::Reject`].
    ///
    /// [`PendingCommitPolicy::Reject`]: crate::PendingCommitPolicy::Reject
    #[error("transaction {txid} is awaiting confirmation")]
    PendingConfirmation {
        /// The unconfirmed transaction holding the window.
        txid: u64,
    },

    /// An RPC handler reported a failure.
    #[error("rpc handler error: {message}")]
    Rpc {
        /// Handler-supplied description.
        message: String,
    },
}

impl EngineError {
    /// Creates a resource error.
    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource {
            message: message.into(),
        }
    }

    /// Creates an invalid-request error.
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }
}

impl From<LogError> for EngineError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::NotFound { txid } => Self::TransactionNotFound { txid },
            LogError::IdExhausted => Self::resource("transaction ID space exhausted"),
            other => Self::resource(other.to_string()),
        }
    }
}
