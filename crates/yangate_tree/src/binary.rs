//! Compact deterministic binary encoding of data trees.
//!
//! This is the lossless wire form: it preserves every [`Value`] variant and
//! the exact node kinds, which the text encodings cannot. The format is
//! deterministic (identical trees encode to identical bytes) so encoded
//! trees are safe to store and compare.
//!
//! ## Layout
//!
//! ```text
//! tree  := magic (4) | version (2, LE) | root_count (4, LE) | node*
//! node  := kind (1) | name_len (2, LE) | name | value | child_count (4, LE) | node*
//! value := tag (1) | payload
//! ```
//!
//! Value tags: 0 none, 1 empty, 2 false, 3 true, 4 int (8, LE),
//! 5 uint (8, LE), 6 string (4-byte LE length + UTF-8), 7 bytes
//! (4-byte LE length + raw).

use crate::error::{ParseError, ParseResult};
use crate::node::{DataNode, DataTree, NodeKind};
use crate::value::Value;

/// Magic bytes identifying a binary-encoded tree.
pub const TREE_MAGIC: [u8; 4] = *b"YGTB";

/// Current binary format version.
pub const TREE_VERSION: u16 = 1;

/// Maximum accepted length for a name, string, or bytes field.
/// Caps allocation from untrusted input.
const MAX_FIELD_LEN: u64 = 256 * 1024 * 1024;

/// Maximum accepted child/root count per node.
const MAX_CHILDREN: u32 = 16 * 1024 * 1024;

/// Maximum nesting depth accepted from untrusted payloads.
const MAX_DEPTH: usize = 128;

/// Encodes a tree to its binary form.
pub(crate) fn serialize(tree: &DataTree) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(&TREE_MAGIC);
    buf.extend_from_slice(&TREE_VERSION.to_le_bytes());
    buf.extend_from_slice(&(tree.roots.len() as u32).to_le_bytes());
    for node in &tree.roots {
        encode_node(&mut buf, node);
    }
    buf
}

fn encode_node(buf: &mut Vec<u8>, node: &DataNode) {
    buf.push(kind_byte(node.kind));
    let name = node.name.as_bytes();
    // Names beyond u16 are not valid YANG identifiers; truncation cannot
    // occur for trees built through this crate's parsers.
    buf.extend_from_slice(&(name.len().min(u16::MAX as usize) as u16).to_le_bytes());
    buf.extend_from_slice(&name[..name.len().min(u16::MAX as usize)]);
    encode_value(buf, node.value.as_ref());
    buf.extend_from_slice(&(node.children.len() as u32).to_le_bytes());
    for child in &node.children {
        encode_node(buf, child);
    }
}

fn encode_value(buf: &mut Vec<u8>, value: Option<&Value>) {
    match value {
        None => buf.push(0),
        Some(Value::Empty) => buf.push(1),
        Some(Value::Bool(false)) => buf.push(2),
        Some(Value::Bool(true)) => buf.push(3),
        Some(Value::Int(n)) => {
            buf.push(4);
            buf.extend_from_slice(&n.to_le_bytes());
        }
        Some(Value::Uint(n)) => {
            buf.push(5);
            buf.extend_from_slice(&n.to_le_bytes());
        }
        Some(Value::Str(s)) => {
            buf.push(6);
            buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        Some(Value::Bytes(b)) => {
            buf.push(7);
            buf.extend_from_slice(&(b.len() as u32).to_le_bytes());
            buf.extend_from_slice(b);
        }
    }
}

fn kind_byte(kind: NodeKind) -> u8 {
    match kind {
        NodeKind::Container => 1,
        NodeKind::ListEntry => 2,
        NodeKind::Leaf => 3,
        NodeKind::LeafListEntry => 4,
        NodeKind::Anydata => 5,
    }
}

fn kind_from_byte(b: u8) -> Option<NodeKind> {
    match b {
        1 => Some(NodeKind::Container),
        2 => Some(NodeKind::ListEntry),
        3 => Some(NodeKind::Leaf),
        4 => Some(NodeKind::LeafListEntry),
        5 => Some(NodeKind::Anydata),
        _ => None,
    }
}

/// Decodes a binary payload into a tree.
pub(crate) fn parse(bytes: &[u8]) -> ParseResult<DataTree> {
    let mut decoder = Decoder::new(bytes);
    let magic = decoder.take(4)?;
    if magic != TREE_MAGIC {
        return Err(ParseError::BadMagic);
    }
    let version = decoder.read_u16()?;
    if version != TREE_VERSION {
        return Err(ParseError::UnsupportedVersion { found: version });
    }
    let root_count = decoder.read_count()?;
    let mut roots = Vec::with_capacity(root_count.min(1024) as usize);
    for _ in 0..root_count {
        roots.push(decoder.decode_node(0)?);
    }
    if !decoder.at_end() {
        return Err(ParseError::limit("trailing bytes after document"));
    }
    Ok(DataTree::new(roots))
}

/// Bounds-checked forward reader over the payload.
struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize) -> ParseResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ParseError::UnexpectedEof)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> ParseResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> ParseResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> ParseResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> ParseResult<u64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }

    fn read_count(&mut self) -> ParseResult<u32> {
        let count = self.read_u32()?;
        if count > MAX_CHILDREN {
            return Err(ParseError::limit("child count"));
        }
        Ok(count)
    }

    fn read_len(&mut self, what: &str) -> ParseResult<usize> {
        let len = u64::from(self.read_u32()?);
        if len > MAX_FIELD_LEN {
            return Err(ParseError::limit(what));
        }
        Ok(len as usize)
    }

    fn decode_node(&mut self, depth: usize) -> ParseResult<DataNode> {
        if depth > MAX_DEPTH {
            return Err(ParseError::limit("nesting depth"));
        }
        let kind_raw = self.read_u8()?;
        let kind = kind_from_byte(kind_raw).ok_or(ParseError::InvalidTag { tag: kind_raw })?;
        let name_len = usize::from(self.read_u16()?);
        let name = std::str::from_utf8(self.take(name_len)?)
            .map_err(|_| ParseError::InvalidUtf8)?
            .to_string();
        let value = self.decode_value()?;
        let child_count = self.read_count()?;
        let mut children = Vec::with_capacity(child_count.min(1024) as usize);
        for _ in 0..child_count {
            children.push(self.decode_node(depth + 1)?);
        }
        Ok(DataNode {
            name,
            kind,
            value,
            children,
        })
    }

    #[allow(clippy::cast_possible_wrap)]
    fn decode_value(&mut self) -> ParseResult<Option<Value>> {
        let tag = self.read_u8()?;
        let value = match tag {
            0 => None,
            1 => Some(Value::Empty),
            2 => Some(Value::Bool(false)),
            3 => Some(Value::Bool(true)),
            4 => Some(Value::Int(self.read_u64()? as i64)),
            5 => Some(Value::Uint(self.read_u64()?)),
            6 => {
                let len = self.read_len("string length")?;
                let text = std::str::from_utf8(self.take(len)?)
                    .map_err(|_| ParseError::InvalidUtf8)?;
                Some(Value::Str(text.to_string()))
            }
            7 => {
                let len = self.read_len("bytes length")?;
                Some(Value::Bytes(self.take(len)?.to_vec()))
            }
            other => return Err(ParseError::InvalidTag { tag: other }),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Encoding;
    use proptest::prelude::*;

    fn sample_tree() -> DataTree {
        DataTree::new(vec![DataNode::container(
            "interfaces",
            vec![
                DataNode::list_entry(
                    "interface",
                    vec![
                        DataNode::leaf("name", "eth0"),
                        DataNode::leaf("enabled", true),
                        DataNode::leaf("mtu", 9000i64),
                        DataNode {
                            name: "blob".into(),
                            kind: NodeKind::Leaf,
                            value: Some(Value::Bytes(vec![0, 1, 2, 255])),
                            children: Vec::new(),
                        },
                    ],
                ),
                DataNode::leaf_list_entry("search", "lab.example"),
            ],
        )])
    }

    #[test]
    fn roundtrip_preserves_kinds_and_values() {
        let tree = sample_tree();
        let reparsed =
            DataTree::parse(&tree.serialize(Encoding::Binary), Encoding::Binary).unwrap();
        assert!(reparsed.equivalent(&tree));
        let entry = &reparsed.roots[0].children[0];
        assert_eq!(entry.kind, NodeKind::ListEntry);
        assert_eq!(
            entry.leaf_value("blob"),
            Some(&Value::Bytes(vec![0, 1, 2, 255]))
        );
    }

    #[test]
    fn deterministic_encoding() {
        let tree = sample_tree();
        assert_eq!(tree.serialize(Encoding::Binary), tree.serialize(Encoding::Binary));
    }

    #[test]
    fn rejects_bad_magic() {
        assert_eq!(
            DataTree::parse(b"NOPE\x01\x00\x00\x00\x00\x00", Encoding::Binary).unwrap_err(),
            ParseError::BadMagic
        );
    }

    #[test]
    fn rejects_future_version() {
        let mut payload = sample_tree().serialize(Encoding::Binary);
        payload[4] = 9;
        assert!(matches!(
            DataTree::parse(&payload, Encoding::Binary).unwrap_err(),
            ParseError::UnsupportedVersion { found: 9 }
        ));
    }

    #[test]
    fn rejects_truncated_payload() {
        let payload = sample_tree().serialize(Encoding::Binary);
        let truncated = &payload[..payload.len() - 3];
        assert_eq!(
            DataTree::parse(truncated, Encoding::Binary).unwrap_err(),
            ParseError::UnexpectedEof
        );
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut payload = sample_tree().serialize(Encoding::Binary);
        payload.push(0);
        assert!(DataTree::parse(&payload, Encoding::Binary).is_err());
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Empty),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            ((i64::MAX as u64 + 1)..=u64::MAX).prop_map(Value::Uint),
            "[a-z0-9 ]{0,24}".prop_map(Value::Str),
            proptest::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
        ]
    }

    proptest! {
        #[test]
        fn binary_roundtrip_any_leaf_forest(values in proptest::collection::vec(value_strategy(), 0..8)) {
            let roots = values
                .into_iter()
                .enumerate()
                .map(|(i, v)| DataNode {
                    name: format!("leaf{i}"),
                    kind: NodeKind::Leaf,
                    value: Some(v),
                    children: Vec::new(),
                })
                .collect();
            let tree = DataTree::new(roots);
            let reparsed =
                DataTree::parse(&tree.serialize(Encoding::Binary), Encoding::Binary).unwrap();
            prop_assert!(reparsed.equivalent(&tree));
        }
    }
}
