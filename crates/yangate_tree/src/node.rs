//! The data tree node model.

use crate::error::{ParseError, ParseResult};
use crate::path::{Path, Segment};
use crate::value::Value;
use std::fmt;

/// Wire encoding of a serialized [`DataTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// JSON text.
    Json,
    /// XML text.
    Xml,
    /// Compact deterministic binary form.
    Binary,
}

impl Encoding {
    /// Returns the lowercase name used on the wire.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structural kind of a data node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Interior node with uniquely-named children.
    Container,
    /// One entry of a keyed list; sibling entries share the name.
    ListEntry,
    /// A scalar-valued terminal node.
    Leaf,
    /// One entry of a leaf-list; sibling entries share the name.
    LeafListEntry,
    /// Opaque subtree not interpreted by the schema.
    Anydata,
}

impl NodeKind {
    /// True for kinds that carry a scalar value instead of children.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Leaf | Self::LeafListEntry)
    }
}

/// A single node of a [`DataTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataNode {
    /// Schema-qualified node name (optionally `module:local`).
    pub name: String,
    /// Structural kind.
    pub kind: NodeKind,
    /// Scalar value; present exactly for terminal kinds.
    pub value: Option<Value>,
    /// Ordered children; empty for terminal kinds.
    pub children: Vec<DataNode>,
}

impl DataNode {
    /// Creates a container node.
    #[must_use]
    pub fn container(name: impl Into<String>, children: Vec<DataNode>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Container,
            value: None,
            children,
        }
    }

    /// Creates a list entry node.
    #[must_use]
    pub fn list_entry(name: impl Into<String>, children: Vec<DataNode>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::ListEntry,
            value: None,
            children,
        }
    }

    /// Creates a leaf node.
    #[must_use]
    pub fn leaf(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Leaf,
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    /// Creates a leaf-list entry node.
    #[must_use]
    pub fn leaf_list_entry(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::LeafListEntry,
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    /// Returns the first child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&DataNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns the value of a direct leaf child, if present.
    #[must_use]
    pub fn leaf_value(&self, name: &str) -> Option<&Value> {
        self.child(name).and_then(|c| c.value.as_ref())
    }

    /// True if this node matches a path segment (name plus key predicates).
    ///
    /// Predicates compare against the canonical text of direct leaf children.
    #[must_use]
    pub fn matches_segment(&self, segment: &Segment) -> bool {
        if self.name != segment.name {
            return false;
        }
        segment.predicates.iter().all(|(key, want)| {
            self.leaf_value(key)
                .is_some_and(|value| value.matches_text(want))
        })
    }

    /// Structural equivalence: same name, kind, value, and equivalent
    /// children. Relative order of differently-named children is ignored;
    /// order among same-named children (list entries) is significant.
    #[must_use]
    pub fn equivalent(&self, other: &DataNode) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.value == other.value
            && children_equivalent(&self.children, &other.children)
    }
}

/// Compares two child sequences per the container ordering rules.
pub(crate) fn children_equivalent(a: &[DataNode], b: &[DataNode]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut names: Vec<&str> = a.iter().map(|n| n.name.as_str()).collect();
    names.dedup();
    for name in names {
        let seq_a: Vec<&DataNode> = a.iter().filter(|n| n.name == name).collect();
        let seq_b: Vec<&DataNode> = b.iter().filter(|n| n.name == name).collect();
        if seq_a.len() != seq_b.len() {
            return false;
        }
        if !seq_a
            .iter()
            .zip(seq_b.iter())
            .all(|(x, y)| x.equivalent(y))
        {
            return false;
        }
    }
    // Both sides must also cover the same name set.
    b.iter().all(|n| a.iter().any(|m| m.name == n.name))
}

/// An ordered forest of data nodes plus the encoding it arrived in.
///
/// The encoding tag records how the tree was serialized on the wire; it is
/// not part of the tree's semantics and is ignored by [`DataTree::equivalent`].
#[derive(Debug, Clone)]
pub struct DataTree {
    /// Root nodes, in document order.
    pub roots: Vec<DataNode>,
    /// Source encoding, if the tree came off the wire.
    pub source_encoding: Option<Encoding>,
}

impl DataTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            roots: Vec::new(),
            source_encoding: None,
        }
    }

    /// Creates a tree from root nodes.
    #[must_use]
    pub fn new(roots: Vec<DataNode>) -> Self {
        Self {
            roots,
            source_encoding: None,
        }
    }

    /// True if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Decodes a wire payload in the given encoding.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] describing the first problem found; no
    /// partially-decoded tree is ever returned.
    pub fn parse(bytes: &[u8], encoding: Encoding) -> ParseResult<Self> {
        let mut tree = match encoding {
            Encoding::Json => crate::json::parse(bytes)?,
            Encoding::Xml => crate::xml::parse(bytes)?,
            Encoding::Binary => crate::binary::parse(bytes)?,
        };
        tree.source_encoding = Some(encoding);
        Ok(tree)
    }

    /// Serializes the tree in the given encoding.
    #[must_use]
    pub fn serialize(&self, encoding: Encoding) -> Vec<u8> {
        match encoding {
            Encoding::Json => crate::json::serialize(self),
            Encoding::Xml => crate::xml::serialize(self),
            Encoding::Binary => crate::binary::serialize(self),
        }
    }

    /// Resolves a path to a node within the tree.
    #[must_use]
    pub fn find(&self, path: &Path) -> Option<&DataNode> {
        let mut segments = path.segments.iter();
        let first = segments.next()?;
        let mut node = self.roots.iter().find(|n| n.matches_segment(first))?;
        for segment in segments {
            node = node
                .children
                .iter()
                .find(|n| n.matches_segment(segment))?;
        }
        Some(node)
    }

    /// Resolves a path to a mutable node within the tree.
    pub fn find_mut(&mut self, path: &Path) -> Option<&mut DataNode> {
        let mut segments = path.segments.iter();
        let first = segments.next()?;
        let mut node = self
            .roots
            .iter_mut()
            .find(|n| n.matches_segment(first))?;
        for segment in segments {
            node = node
                .children
                .iter_mut()
                .find(|n| n.matches_segment(segment))?;
        }
        Some(node)
    }

    /// Returns the subtree rooted at `path` as a standalone tree, or an
    /// empty tree when the path resolves to nothing.
    #[must_use]
    pub fn subtree(&self, path: &Path) -> Self {
        if path.segments.is_empty() {
            return self.clone();
        }
        match self.find(path) {
            Some(node) => Self::new(vec![node.clone()]),
            None => Self::empty(),
        }
    }

    /// Structural equivalence, ignoring the source encoding tag.
    #[must_use]
    pub fn equivalent(&self, other: &DataTree) -> bool {
        children_equivalent(&self.roots, &other.roots)
    }

    /// Total number of nodes in the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[DataNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.roots)
    }
}

impl PartialEq for DataTree {
    fn eq(&self, other: &Self) -> bool {
        self.equivalent(other)
    }
}

impl Eq for DataTree {}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface(name: &str, enabled: bool) -> DataNode {
        DataNode::list_entry(
            "interface",
            vec![
                DataNode::leaf("name", name),
                DataNode::leaf("enabled", enabled),
            ],
        )
    }

    #[test]
    fn find_with_list_predicate() {
        let tree = DataTree::new(vec![DataNode::container(
            "interfaces",
            vec![interface("eth0", true), interface("eth1", false)],
        )]);
        let path: Path = "/interfaces/interface[name=eth1]/enabled".parse().unwrap();
        let node = tree.find(&path).unwrap();
        assert_eq!(node.value, Some(Value::Bool(false)));
    }

    #[test]
    fn container_child_order_insignificant() {
        let a = DataTree::new(vec![DataNode::container(
            "system",
            vec![
                DataNode::leaf("hostname", "r1"),
                DataNode::leaf("domain", "lab"),
            ],
        )]);
        let b = DataTree::new(vec![DataNode::container(
            "system",
            vec![
                DataNode::leaf("domain", "lab"),
                DataNode::leaf("hostname", "r1"),
            ],
        )]);
        assert!(a.equivalent(&b));
    }

    #[test]
    fn list_entry_order_significant() {
        let a = DataTree::new(vec![DataNode::container(
            "interfaces",
            vec![interface("eth0", true), interface("eth1", true)],
        )]);
        let b = DataTree::new(vec![DataNode::container(
            "interfaces",
            vec![interface("eth1", true), interface("eth0", true)],
        )]);
        assert!(!a.equivalent(&b));
    }

    #[test]
    fn encoding_tag_ignored_by_equivalence() {
        let mut a = DataTree::new(vec![DataNode::leaf("hostname", "r1")]);
        let b = a.clone();
        a.source_encoding = Some(Encoding::Json);
        assert!(a.equivalent(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn subtree_of_missing_path_is_empty() {
        let tree = DataTree::new(vec![DataNode::leaf("hostname", "r1")]);
        let path: Path = "/nope".parse().unwrap();
        assert!(tree.subtree(&path).is_empty());
    }
}
