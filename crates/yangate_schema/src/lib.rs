//! # Yangate Schema
//!
//! The schema registry and validator sitting between the wire and the
//! transaction engine.
//!
//! [`SchemaRegistry`] holds the set of loaded modules and resolves data
//! paths to node metadata. Modules arrive as a declarative JSON description
//! (YANG source compilation is an external collaborator; this crate consumes
//! its output at the interface boundary). The registry is read-mostly after
//! startup and safe to share behind an `Arc`.
//!
//! [`validate`] checks a candidate tree against the registry: path
//! resolution, list-key and mandatory-leaf constraints, leaf type
//! conformance, then any pluggable per-path constraint checks. It never
//! mutates anything and runs against snapshots, so it is safe to call
//! concurrently with commits.
//!
//! [`normalize`] re-tags node kinds and coerces text-sourced leaf values to
//! their schema types, so trees coming from type-poor encodings (XML)
//! compare equal to typed ones after admission.

mod error;
mod module;
mod registry;
mod validator;

pub use error::{SchemaError, SchemaResult, ValidationError, ValidationResult};
pub use module::{LeafType, ModuleData, NodeSchema, SchemaNodeKind};
pub use registry::{ConstraintCheck, RpcHandler, RpcHandlerError, SchemaRegistry};
pub use validator::{fill_defaults, normalize, validate};
