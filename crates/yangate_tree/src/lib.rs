//! # Yangate Tree
//!
//! The in-memory configuration data tree and its wire encodings.
//!
//! A [`DataTree`] is an ordered forest of schema-qualified nodes holding
//! configuration and/or state data. The tree itself is encoding-independent;
//! encodings are a boundary concern handled by [`DataTree::parse`] and
//! [`DataTree::serialize`].
//!
//! ## Encodings
//!
//! - **JSON** — objects for containers, arrays for list/leaf-list entries,
//!   typed scalars for leaves.
//! - **XML** — one element per node under a `<data>` envelope, text content
//!   for leaf values (all values arrive as strings; schema-driven coercion
//!   happens above this crate).
//! - **Binary** — a deterministic, length-prefixed format that preserves the
//!   full [`Value`] range. Strictly more faithful than the text encodings.
//!
//! ## Round-trip contract
//!
//! For any tree produced by `parse`, `serialize` followed by `parse` with the
//! same encoding yields an equivalent tree. Equivalence ignores the source
//! encoding tag and, among a node's children, the relative order of
//! differently-named siblings; same-named siblings (list entries) keep
//! significant order.
//!
//! ## Edits
//!
//! [`merge`], [`replace`] and [`apply_change_patch`] implement the three
//! commit operations; [`diff`] produces a change patch that transforms one
//! tree into another. All of them leave their inputs untouched and fail
//! without partial effect.

mod binary;
mod edit;
mod error;
mod json;
mod node;
mod path;
mod value;
mod xml;

pub use edit::{apply_change_patch, diff, merge, replace, ChangeOp, KeyLookup, NoKeys};
pub use error::{ParseError, ParseResult, PatchError, PatchResult};
pub use node::{DataNode, DataTree, Encoding, NodeKind};
pub use path::{Path, Segment};
pub use value::Value;
