//! Service errors and their status mapping.

use yangate_engine::EngineError;
use yangate_schema::SchemaError;

/// Result type for service handlers.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Status codes a framing layer reports to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// Unknown module, revision, transaction, or node.
    NotFound,
    /// Malformed or rejected request (parse, validation, bad path).
    InvalidArgument,
    /// Transaction ID space or log storage exhausted.
    ResourceExhausted,
    /// Internal failure (handler bodies, corrupt stored state).
    Internal,
}

/// A failed service request.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct ServiceError {
    /// The status code the framing layer should report.
    pub code: StatusCode,
    /// Human-readable detail.
    pub message: String,
}

impl ServiceError {
    /// Creates an error with the given code.
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// A `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, message)
    }

    /// An `InvalidArgument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InvalidArgument, message)
    }

    /// A `ResourceExhausted` error.
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(StatusCode::ResourceExhausted, message)
    }

    /// An `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Internal, message)
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        let code = match &err {
            EngineError::Schema(SchemaError::ModuleNotFound { .. }) => StatusCode::NotFound,
            EngineError::TransactionNotFound { .. } => StatusCode::NotFound,
            EngineError::Schema(_)
            | EngineError::Parse(_)
            | EngineError::Validation(_)
            | EngineError::Patch(_)
            | EngineError::Request { .. }
            | EngineError::PendingConfirmation { .. } => StatusCode::InvalidArgument,
            EngineError::Resource { .. } => StatusCode::ResourceExhausted,
            EngineError::Rpc { .. } => StatusCode::Internal,
        };
        Self::new(code, err.to_string())
    }
}
