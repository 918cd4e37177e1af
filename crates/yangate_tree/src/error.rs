//! Error types for tree parsing and editing.

use thiserror::Error;

/// Result type for parse/serialize operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for change-patch application.
pub type PatchResult<T> = Result<T, PatchError>;

/// Errors raised while decoding a wire payload into a [`crate::DataTree`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The payload ended before a complete document was read.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A string field was not valid UTF-8.
    #[error("invalid UTF-8 in payload")]
    InvalidUtf8,

    /// The JSON payload was malformed or used an unsupported construct.
    #[error("invalid JSON payload: {message}")]
    Json {
        /// Description of the problem.
        message: String,
    },

    /// The XML payload was malformed.
    #[error("invalid XML payload at byte {offset}: {message}")]
    Xml {
        /// Byte offset of the first offending input.
        offset: usize,
        /// Description of the problem.
        message: String,
    },

    /// The binary payload did not start with the expected magic bytes.
    #[error("bad magic bytes in binary payload")]
    BadMagic,

    /// The binary payload uses a format version this build does not support.
    #[error("unsupported binary format version {found}")]
    UnsupportedVersion {
        /// Version found in the payload.
        found: u16,
    },

    /// The binary payload contained an unknown value or node tag.
    #[error("invalid tag byte {tag:#04x} in binary payload")]
    InvalidTag {
        /// The offending tag byte.
        tag: u8,
    },

    /// A declared length exceeds the decoder's safety limits.
    #[error("payload limit exceeded: {what}")]
    LimitExceeded {
        /// Which limit was hit.
        what: String,
    },

    /// Floating-point scalars are not representable in the data model.
    #[error("floating-point values are not supported; encode decimals as strings")]
    FloatForbidden,

    /// A path string could not be parsed.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// The offending path text.
        path: String,
        /// Description of the problem.
        reason: String,
    },
}

impl ParseError {
    /// Creates a JSON parse error.
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
        }
    }

    /// Creates an XML parse error at the given input offset.
    pub fn xml(offset: usize, message: impl Into<String>) -> Self {
        Self::Xml {
            offset,
            message: message.into(),
        }
    }

    /// Creates a limit-exceeded error.
    pub fn limit(what: impl Into<String>) -> Self {
        Self::LimitExceeded { what: what.into() }
    }

    /// Creates an invalid-path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of one step inside an ordered change patch.
///
/// The whole patch aborts at the first failing operation; `index` identifies
/// it within the submitted sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("change patch failed at operation {index} ({path}): {reason}")]
pub struct PatchError {
    /// Zero-based index of the failing operation.
    pub index: usize,
    /// The path the failing operation addressed.
    pub path: String,
    /// Description of the failure.
    pub reason: String,
}

impl PatchError {
    /// Creates a patch error for the operation at `index`.
    pub fn new(index: usize, path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            index,
            path: path.into(),
            reason: reason.into(),
        }
    }
}
