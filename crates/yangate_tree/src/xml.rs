//! XML encoding of data trees.
//!
//! One element per node under a `<data>` envelope; leaf values are text
//! content; repeated sibling names become list / leaf-list entries. All leaf
//! values arrive as strings — XML carries no type information, so coercion
//! to schema types happens in the schema layer. Attributes are ignored on
//! input and never produced on output.

use crate::error::{ParseError, ParseResult};
use crate::node::{DataNode, DataTree, NodeKind};
use crate::value::Value;

/// Maximum nesting depth accepted from untrusted payloads.
const MAX_DEPTH: usize = 128;

/// Envelope element wrapping the forest; XML requires a single root.
const ENVELOPE: &str = "data";

/// Encodes a tree as XML.
pub(crate) fn serialize(tree: &DataTree) -> Vec<u8> {
    let mut out = String::new();
    out.push('<');
    out.push_str(ENVELOPE);
    out.push('>');
    for node in &tree.roots {
        write_node(&mut out, node);
    }
    out.push_str("</");
    out.push_str(ENVELOPE);
    out.push('>');
    out.into_bytes()
}

fn write_node(out: &mut String, node: &DataNode) {
    out.push('<');
    out.push_str(&node.name);
    if node.kind.is_terminal() {
        match &node.value {
            Some(Value::Empty) | None => {
                out.push_str("/>");
                return;
            }
            Some(value) => {
                out.push('>');
                escape_into(out, &value.canonical_text());
            }
        }
    } else {
        out.push('>');
        for child in &node.children {
            write_node(out, child);
        }
    }
    out.push_str("</");
    out.push_str(&node.name);
    out.push('>');
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
}

/// Decodes an XML payload into a tree.
pub(crate) fn parse(bytes: &[u8]) -> ParseResult<DataTree> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8)?;
    let mut scanner = Scanner::new(text);
    scanner.skip_misc()?;
    if scanner.at_end() {
        return Ok(DataTree::empty());
    }
    let root = scanner.parse_element(0)?;
    scanner.skip_misc()?;
    if !scanner.at_end() {
        return Err(ParseError::xml(scanner.pos, "trailing content after document element"));
    }
    // Unwrap the envelope if present; accept a bare single root otherwise.
    let roots = if root.name == ENVELOPE {
        root.children
    } else {
        vec![root]
    };
    Ok(DataTree::new(roots))
}

/// A minimal forward-only XML scanner.
///
/// Supports exactly the documents [`serialize`] produces, plus prologs,
/// comments, attributes (skipped), and the five predefined entities.
struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    /// Skips whitespace, XML prologs, and comments.
    fn skip_misc(&mut self) -> ParseResult<()> {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if let Some(after) = self.rest().strip_prefix("<?") {
                let end = after
                    .find("?>")
                    .ok_or_else(|| ParseError::xml(self.pos, "unterminated processing instruction"))?;
                self.pos += 2 + end + 2;
            } else if let Some(after) = self.rest().strip_prefix("<!--") {
                let end = after
                    .find("-->")
                    .ok_or_else(|| ParseError::xml(self.pos, "unterminated comment"))?;
                self.pos += 4 + end + 3;
            } else {
                return Ok(());
            }
        }
    }

    /// Parses one element and its subtree, leaving `pos` after its end tag.
    fn parse_element(&mut self, depth: usize) -> ParseResult<DataNode> {
        if depth > MAX_DEPTH {
            return Err(ParseError::limit("nesting depth"));
        }
        if !self.rest().starts_with('<') {
            return Err(ParseError::xml(self.pos, "expected element start"));
        }
        self.pos += 1;
        let name = self.read_name()?;

        // Skip attributes up to '>' or '/>'.
        let tag_rest = self.rest();
        let close = tag_rest
            .find('>')
            .ok_or_else(|| ParseError::xml(self.pos, "unterminated start tag"))?;
        let self_closing = tag_rest[..close].trim_end().ends_with('/');
        self.pos += close + 1;

        if self_closing {
            return Ok(DataNode {
                name,
                kind: NodeKind::Leaf,
                value: Some(Value::Empty),
                children: Vec::new(),
            });
        }

        let mut children = Vec::new();
        let mut text = String::new();
        loop {
            self.skip_comments()?;
            let rest = self.rest();
            if rest.is_empty() {
                return Err(ParseError::UnexpectedEof);
            }
            if let Some(after) = rest.strip_prefix("</") {
                let end = after
                    .find('>')
                    .ok_or_else(|| ParseError::xml(self.pos, "unterminated end tag"))?;
                let closing = after[..end].trim();
                if closing != name {
                    return Err(ParseError::xml(
                        self.pos,
                        format!("mismatched end tag: expected </{name}>, got </{closing}>"),
                    ));
                }
                self.pos += 2 + end + 1;
                break;
            }
            if rest.starts_with('<') {
                children.push(self.parse_element(depth + 1)?);
            } else {
                let chunk_len = rest.find('<').unwrap_or(rest.len());
                text.push_str(&unescape(&rest[..chunk_len], self.pos)?);
                self.pos += chunk_len;
            }
        }

        let trimmed = text.trim();
        if !children.is_empty() {
            if !trimmed.is_empty() {
                return Err(ParseError::xml(self.pos, "mixed element and text content"));
            }
            Ok(DataNode {
                name,
                kind: NodeKind::Container,
                value: None,
                children: classify_repeats(children),
            })
        } else if trimmed.is_empty() {
            // <name></name>: an empty-typed leaf, same as <name/>.
            Ok(DataNode {
                name,
                kind: NodeKind::Leaf,
                value: Some(Value::Empty),
                children: Vec::new(),
            })
        } else {
            Ok(DataNode {
                name,
                kind: NodeKind::Leaf,
                value: Some(Value::Str(trimmed.to_string())),
                children: Vec::new(),
            })
        }
    }

    fn skip_comments(&mut self) -> ParseResult<()> {
        while let Some(after) = self.rest().strip_prefix("<!--") {
            let end = after
                .find("-->")
                .ok_or_else(|| ParseError::xml(self.pos, "unterminated comment"))?;
            self.pos += 4 + end + 3;
        }
        Ok(())
    }

    fn read_name(&mut self) -> ParseResult<String> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(ParseError::xml(self.pos, "empty element name"));
        }
        let name = &rest[..end];
        if name.contains('<') || name.contains('&') {
            return Err(ParseError::xml(self.pos, "invalid element name"));
        }
        self.pos += end;
        Ok(name.to_string())
    }
}

fn unescape(text: &str, offset: usize) -> ParseResult<String> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let end = rest
            .find(';')
            .ok_or_else(|| ParseError::xml(offset, "unterminated entity reference"))?;
        match &rest[1..end] {
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "amp" => out.push('&'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            other => {
                return Err(ParseError::xml(
                    offset,
                    format!("unknown entity reference &{other};"),
                ))
            }
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Re-tags children: names occurring more than once are list entries
/// (element children) or leaf-list entries (text leaves).
fn classify_repeats(children: Vec<DataNode>) -> Vec<DataNode> {
    let mut out = children;
    let names: Vec<String> = out.iter().map(|c| c.name.clone()).collect();
    for node in &mut out {
        let repeats = names.iter().filter(|n| **n == node.name).count() > 1;
        if repeats {
            node.kind = match node.kind {
                NodeKind::Container | NodeKind::ListEntry | NodeKind::Anydata => NodeKind::ListEntry,
                NodeKind::Leaf | NodeKind::LeafListEntry => NodeKind::LeafListEntry,
            };
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Encoding;

    #[test]
    fn roundtrip_simple_document() {
        let payload = b"<data><system><hostname>r1</hostname><location>lab &amp; office</location></system></data>";
        let tree = DataTree::parse(payload, Encoding::Xml).unwrap();
        assert_eq!(
            tree.roots[0].leaf_value("location"),
            Some(&Value::Str("lab & office".into()))
        );
        let reparsed =
            DataTree::parse(&tree.serialize(Encoding::Xml), Encoding::Xml).unwrap();
        assert!(reparsed.equivalent(&tree));
    }

    #[test]
    fn repeated_elements_become_list_entries() {
        let payload = b"<data><interfaces>\
            <interface><name>eth0</name></interface>\
            <interface><name>eth1</name></interface>\
            </interfaces></data>";
        let tree = DataTree::parse(payload, Encoding::Xml).unwrap();
        let interfaces = &tree.roots[0];
        assert_eq!(interfaces.children.len(), 2);
        assert!(interfaces
            .children
            .iter()
            .all(|c| c.kind == NodeKind::ListEntry));
    }

    #[test]
    fn repeated_text_elements_become_leaf_list_entries() {
        let payload = b"<data><dns><server>1.1.1.1</server><server>9.9.9.9</server></dns></data>";
        let tree = DataTree::parse(payload, Encoding::Xml).unwrap();
        assert!(tree.roots[0]
            .children
            .iter()
            .all(|c| c.kind == NodeKind::LeafListEntry));
    }

    #[test]
    fn empty_element_is_empty_leaf() {
        let tree = DataTree::parse(b"<data><enabled/></data>", Encoding::Xml).unwrap();
        assert_eq!(tree.roots[0].value, Some(Value::Empty));
        let reparsed =
            DataTree::parse(&tree.serialize(Encoding::Xml), Encoding::Xml).unwrap();
        assert!(reparsed.equivalent(&tree));
    }

    #[test]
    fn prolog_and_comments_are_skipped() {
        let payload = br#"<?xml version="1.0"?><!-- cfg --><data><x>1</x></data>"#;
        let tree = DataTree::parse(payload, Encoding::Xml).unwrap();
        assert_eq!(tree.roots[0].value, Some(Value::Str("1".into())));
    }

    #[test]
    fn attributes_are_ignored() {
        let payload = br#"<data xmlns="urn:cfg"><x a="b">v</x></data>"#;
        let tree = DataTree::parse(payload, Encoding::Xml).unwrap();
        assert_eq!(tree.roots[0].value, Some(Value::Str("v".into())));
    }

    #[test]
    fn rejects_mismatched_tags() {
        let err = DataTree::parse(b"<data><a>1</b></data>", Encoding::Xml).unwrap_err();
        assert!(matches!(err, ParseError::Xml { .. }));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(DataTree::parse(b"<data/><extra/>", Encoding::Xml).is_err());
    }

    #[test]
    fn values_serialize_as_canonical_text() {
        let tree = DataTree::new(vec![DataNode::leaf("mtu", 1500i64)]);
        let xml = String::from_utf8(tree.serialize(Encoding::Xml)).unwrap();
        assert_eq!(xml, "<data><mtu>1500</mtu></data>");
    }
}
