//! Error types for schema loading and validation.

use thiserror::Error;

/// Result type for schema registry operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Errors raised while loading or resolving schema modules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The module source text could not be understood.
    #[error("invalid module source: {message}")]
    BadSource {
        /// Description of the problem.
        message: String,
    },

    /// The module imports another module that is not loaded.
    #[error("module {module} imports {import}, which is not loaded")]
    UnresolvedImport {
        /// The module being loaded.
        module: String,
        /// The missing dependency.
        import: String,
    },

    /// Two nodes in the module set claim the same schema path.
    #[error("duplicate schema path {path} (module {module})")]
    DuplicatePath {
        /// The conflicting path.
        path: String,
        /// The module introducing the duplicate.
        module: String,
    },

    /// A node schema is internally inconsistent.
    #[error("invalid node schema at {path}: {message}")]
    InvalidNode {
        /// Path of the offending node.
        path: String,
        /// Description of the problem.
        message: String,
    },

    /// The requested module or revision is not loaded.
    #[error("module {name} revision {revision:?} not found")]
    ModuleNotFound {
        /// Module name.
        name: String,
        /// Requested revision, if any.
        revision: Option<String>,
    },
}

impl SchemaError {
    /// Creates a bad-source error.
    pub fn bad_source(message: impl Into<String>) -> Self {
        Self::BadSource {
            message: message.into(),
        }
    }

    /// Creates an invalid-node error.
    pub fn invalid_node(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidNode {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A structural or semantic constraint violation in a candidate tree.
///
/// Carries the data path of the offending node and a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed at {path}: {reason}")]
pub struct ValidationError {
    /// Data path of the offending node.
    pub path: String,
    /// Why the node was rejected.
    pub reason: String,
}

impl ValidationError {
    /// Creates a validation error for the node at `path`.
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
