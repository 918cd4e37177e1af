//! Schema module model and its declarative source format.
//!
//! A module source is a JSON document produced by the (external) YANG
//! compiler front end:
//!
//! ```json
//! {
//!   "name": "interfaces",
//!   "organization": "Example Networks",
//!   "revision": "2026-01-15",
//!   "features": ["vlan"],
//!   "imports": [],
//!   "nodes": [
//!     { "path": "/interfaces", "kind": "container" },
//!     { "path": "/interfaces/interface", "kind": "list", "keys": ["name"] },
//!     { "path": "/interfaces/interface/name", "kind": "leaf",
//!       "type": { "base": "string" }, "mandatory": true },
//!     { "path": "/interfaces/interface/mtu", "kind": "leaf",
//!       "type": { "base": "uint", "min": 68, "max": 9216 }, "default": "1500" }
//!   ],
//!   "rpcs": ["/interfaces/reset"]
//! }
//! ```
//!
//! RPC and action input/output parameters are ordinary nodes under
//! `<rpc-path>/input/...` and `<rpc-path>/output/...`.

use serde::{Deserialize, Serialize};

/// Kind of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaNodeKind {
    /// Interior node with uniquely-named children.
    Container,
    /// Keyed list.
    List,
    /// Scalar leaf.
    Leaf,
    /// Multi-valued leaf.
    LeafList,
    /// Opaque subtree.
    Anydata,
    /// RPC or action head; parameters live under `input`/`output` children.
    Rpc,
}

/// Type of a leaf or leaf-list value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "base", rename_all = "kebab-case")]
pub enum LeafType {
    /// Free-form UTF-8 text.
    String,
    /// Boolean.
    Boolean,
    /// Presence-only value.
    Empty,
    /// Opaque bytes (base64 text form).
    Binary,
    /// decimal64 carried in text form; digits with optional sign and point.
    Decimal,
    /// Signed integer with optional range restriction.
    Int {
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    /// Unsigned integer with optional range restriction.
    Uint {
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<u64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<u64>,
    },
    /// Closed set of named values.
    Enumeration {
        /// Permitted values.
        values: Vec<String>,
    },
}

/// Schema metadata for one data node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSchema {
    /// Absolute, predicate-free schema path.
    pub path: String,
    /// Node kind.
    pub kind: SchemaNodeKind,
    /// Leaf/leaf-list value type; required for those kinds.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub leaf_type: Option<LeafType>,
    /// Key leaf names, for lists.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    /// Whether the node must be present in every parent instance.
    #[serde(default)]
    pub mandatory: bool,
    /// Whether the node is configuration (true) or operational state.
    #[serde(default = "default_config")]
    pub config: bool,
    /// Default value in canonical text form, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

fn default_config() -> bool {
    true
}

impl NodeSchema {
    /// The node's local name (last path segment).
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A loaded schema module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleData {
    /// Module name.
    pub name: String,
    /// Publishing organization.
    #[serde(default)]
    pub organization: String,
    /// Revision date, `YYYY-MM-DD`.
    pub revision: String,
    /// Supported feature names.
    #[serde(default)]
    pub features: Vec<String>,
    /// Names of modules this one depends on.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Node schemas contributed by the module.
    #[serde(default)]
    pub nodes: Vec<NodeSchema>,
    /// Schema paths that are RPC/action heads.
    #[serde(default)]
    pub rpcs: Vec<String>,
}

impl ModuleData {
    /// Parses a module from its declarative JSON source.
    pub(crate) fn from_source(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }
}
