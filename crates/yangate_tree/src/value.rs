//! Scalar leaf values.

use std::fmt;

/// A scalar value carried by a leaf or leaf-list entry.
///
/// The set deliberately excludes floating-point numbers: YANG `decimal64`
/// values travel as strings and are interpreted by the schema layer. This
/// keeps every encoding deterministic and comparison exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// The YANG `empty` type: presence is the value.
    Empty,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (covers int8 through int64).
    Int(i64),
    /// Unsigned integer (covers uint8 through uint64).
    Uint(u64),
    /// Text string (also carries enumerations and decimal64 text forms).
    Str(String),
    /// Opaque binary value. Only representable losslessly in the binary
    /// encoding; JSON renders it as base64 text.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns a short name for the value's variant, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Uint(_) => "unsigned",
            Self::Str(_) => "string",
            Self::Bytes(_) => "binary",
        }
    }

    /// Renders the canonical text form used in path predicates and XML.
    ///
    /// `Empty` renders as the empty string; `Bytes` as base64.
    #[must_use]
    pub fn canonical_text(&self) -> String {
        use base64::Engine as _;
        match self {
            Self::Empty => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Uint(n) => n.to_string(),
            Self::Str(s) => s.clone(),
            Self::Bytes(b) => base64::engine::general_purpose::STANDARD.encode(b),
        }
    }

    /// Returns the string content if this is a `Str` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean content if this is a `Bool` value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as a signed integer if it is numeric and fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Uint(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Returns the value as an unsigned integer if it is numeric and fits.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Uint(n) => Some(*n),
            Self::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Compares against the canonical text form, used by path predicates.
    ///
    /// Predicates arrive as text regardless of the wire encoding, so a
    /// predicate `[name=eth0]` must match both `Str("eth0")` and an XML-
    /// sourced string, and `[mtu=1500]` must match `Uint(1500)`.
    #[must_use]
    pub fn matches_text(&self, text: &str) -> bool {
        self.canonical_text() == text
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u64> for Value {
    /// Canonical numeric form: signed when the value fits, `Uint` only for
    /// the upper half of the u64 range. Keeps equality consistent across
    /// encodings that do not distinguish signedness.
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(i) => Self::Int(i),
            Err(_) => Self::Uint(n),
        }
    }
}
