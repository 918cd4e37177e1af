//! Request and response messages of the northbound surface.
//!
//! These mirror the wire contract one-to-one; the framing layer maps them
//! to whatever transport it speaks. Trees cross the boundary as a
//! [`TreePayload`]: an encoding tag plus a text or binary body whose
//! variant must match the tag.

use crate::error::{ServiceError, ServiceResult};
use yangate_engine::DataType;
use yangate_tree::{DataTree, Encoding};

/// A serialized tree with its declared encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePayload {
    /// The declared wire encoding.
    pub encoding: Encoding,
    /// The serialized body.
    pub body: PayloadBody,
}

/// The body of a [`TreePayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadBody {
    /// Text body, for JSON and XML.
    Text(String),
    /// Binary body, for the compact binary encoding.
    Bytes(Vec<u8>),
}

impl TreePayload {
    /// Wraps a JSON text body.
    #[must_use]
    pub fn json(text: impl Into<String>) -> Self {
        Self {
            encoding: Encoding::Json,
            body: PayloadBody::Text(text.into()),
        }
    }

    /// Wraps an XML text body.
    #[must_use]
    pub fn xml(text: impl Into<String>) -> Self {
        Self {
            encoding: Encoding::Xml,
            body: PayloadBody::Text(text.into()),
        }
    }

    /// Wraps a binary body.
    #[must_use]
    pub fn binary(bytes: Vec<u8>) -> Self {
        Self {
            encoding: Encoding::Binary,
            body: PayloadBody::Bytes(bytes),
        }
    }

    /// Serializes a tree into a payload of the given encoding.
    ///
    /// # Errors
    ///
    /// `Internal` if a text encoding produced invalid UTF-8.
    pub fn from_tree(tree: &DataTree, encoding: Encoding) -> ServiceResult<Self> {
        let bytes = tree.serialize(encoding);
        let body = match encoding {
            Encoding::Json | Encoding::Xml => PayloadBody::Text(
                String::from_utf8(bytes)
                    .map_err(|_| ServiceError::internal("serializer produced invalid UTF-8"))?,
            ),
            Encoding::Binary => PayloadBody::Bytes(bytes),
        };
        Ok(Self { encoding, body })
    }

    /// Decodes the payload into a tree.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the body variant does not match the declared
    /// encoding, or when the body does not parse.
    pub fn decode(&self) -> ServiceResult<DataTree> {
        let bytes: &[u8] = match (&self.encoding, &self.body) {
            (Encoding::Json | Encoding::Xml, PayloadBody::Text(text)) => text.as_bytes(),
            (Encoding::Binary, PayloadBody::Bytes(bytes)) => bytes,
            (encoding, _) => {
                return Err(ServiceError::invalid_argument(format!(
                    "payload body does not match declared {} encoding",
                    encoding.name()
                )))
            }
        };
        DataTree::parse(bytes, self.encoding)
            .map_err(|err| ServiceError::invalid_argument(format!("bad payload: {err}")))
    }
}

/// The edit kind of a commit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Merge the payload into the running configuration.
    Merge,
    /// Replace the running configuration with the payload.
    Replace,
    /// Apply the payload as an ordered change patch.
    Change,
}

/// `Capabilities` response.
#[derive(Debug, Clone)]
pub struct CapabilitiesResponse {
    /// Service semver version.
    pub version: String,
    /// Loaded schema modules.
    pub modules: Vec<ModuleInfo>,
    /// Supported wire encodings.
    pub encodings: Vec<Encoding>,
}

/// One loaded module, as advertised by `Capabilities`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Module name.
    pub name: String,
    /// Publishing organization.
    pub organization: String,
    /// Revision date.
    pub revision: String,
    /// Supported feature names.
    pub features: Vec<String>,
}

/// `GetSchema` request.
#[derive(Debug, Clone)]
pub struct GetSchemaRequest {
    /// Module or submodule name.
    pub module: String,
    /// Specific revision; latest when absent.
    pub revision: Option<String>,
}

/// `GetSchema` response.
#[derive(Debug, Clone)]
pub struct GetSchemaResponse {
    /// The module source text.
    pub text: String,
}

/// `Get` request.
#[derive(Debug, Clone)]
pub struct GetRequest {
    /// Which data class to return.
    pub data_type: DataType,
    /// Response encoding.
    pub encoding: Encoding,
    /// Whether to fill in schema default values.
    pub with_defaults: bool,
    /// Subtree path; the whole configuration when absent.
    pub path: Option<String>,
}

/// `Get` response.
#[derive(Debug, Clone)]
pub struct GetResponse {
    /// Snapshot time, nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
    /// The requested data.
    pub data: TreePayload,
}

/// `Validate` request.
#[derive(Debug, Clone)]
pub struct ValidateRequest {
    /// The candidate tree.
    pub data: TreePayload,
}

/// `Commit` request.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    /// The edit kind.
    pub operation: Operation,
    /// The payload tree (for `Change`, the encoded change list).
    pub data: TreePayload,
    /// Free-text audit comment.
    pub comment: String,
    /// Confirmation window in minutes; 0 commits outright.
    pub confirmed_timeout: u32,
}

/// `Commit` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitResponse {
    /// The allocated transaction ID.
    pub txid: u64,
}

/// `Execute` request.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    /// A tree holding exactly one RPC/action invocation.
    pub data: TreePayload,
}

/// `Execute` response.
#[derive(Debug, Clone)]
pub struct ExecuteResponse {
    /// The invocation tree with output parameters appended.
    pub data: TreePayload,
}

/// One record in a `ListTransactions` stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInfo {
    /// Transaction ID.
    pub txid: u64,
    /// Commit time, nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
    /// Audit comment.
    pub comment: String,
}

/// `GetTransaction` request.
#[derive(Debug, Clone)]
pub struct GetTransactionRequest {
    /// The transaction to fetch.
    pub txid: u64,
    /// Response encoding.
    pub encoding: Encoding,
}

/// `GetTransaction` response.
#[derive(Debug, Clone)]
pub struct GetTransactionResponse {
    /// Transaction ID.
    pub txid: u64,
    /// Commit time, nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
    /// Audit comment.
    pub comment: String,
    /// The configuration exactly as committed.
    pub data: TreePayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use yangate_tree::DataNode;

    #[test]
    fn payload_roundtrip_json() {
        let tree = DataTree::new(vec![DataNode::leaf("hostname", "router1")]);
        let payload = TreePayload::from_tree(&tree, Encoding::Json).unwrap();
        assert!(matches!(payload.body, PayloadBody::Text(_)));
        assert!(payload.decode().unwrap().equivalent(&tree));
    }

    #[test]
    fn payload_roundtrip_binary() {
        let tree = DataTree::new(vec![DataNode::leaf("hostname", "router1")]);
        let payload = TreePayload::from_tree(&tree, Encoding::Binary).unwrap();
        assert!(matches!(payload.body, PayloadBody::Bytes(_)));
        assert!(payload.decode().unwrap().equivalent(&tree));
    }

    #[test]
    fn mismatched_body_variant_is_rejected() {
        let payload = TreePayload {
            encoding: Encoding::Json,
            body: PayloadBody::Bytes(vec![1, 2, 3]),
        };
        let err = payload.decode().unwrap_err();
        assert_eq!(err.code, crate::StatusCode::InvalidArgument);
    }
}
