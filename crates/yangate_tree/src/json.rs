//! JSON encoding of data trees.
//!
//! Containers map to objects, list entries to array elements, leaf-lists to
//! arrays of scalars, leaves to scalars. `Bytes` values render as base64
//! strings, so a parse never produces `Bytes`; the binary encoding is the
//! lossless carrier for those.

use crate::error::{ParseError, ParseResult};
use crate::node::{DataNode, DataTree, NodeKind};
use crate::value::Value;
use serde_json::{Map, Number, Value as Json};

/// Maximum nesting depth accepted from untrusted payloads.
const MAX_DEPTH: usize = 128;

/// Decodes a JSON payload into a tree.
pub(crate) fn parse(bytes: &[u8]) -> ParseResult<DataTree> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8)?;
    let json: Json = serde_json::from_str(text).map_err(|e| ParseError::json(e.to_string()))?;
    let object = match json {
        Json::Object(map) => map,
        Json::Null => return Ok(DataTree::empty()),
        other => {
            return Err(ParseError::json(format!(
                "top level must be an object, got {}",
                json_type_name(&other)
            )))
        }
    };
    let mut roots = Vec::new();
    for (name, value) in object {
        parse_member(&name, &value, 0, &mut roots)?;
    }
    Ok(DataTree::new(roots))
}

fn parse_member(
    name: &str,
    value: &Json,
    depth: usize,
    out: &mut Vec<DataNode>,
) -> ParseResult<()> {
    if depth > MAX_DEPTH {
        return Err(ParseError::limit("nesting depth"));
    }
    match value {
        Json::Object(map) => {
            let mut children = Vec::new();
            for (child_name, child_value) in map {
                parse_member(child_name, child_value, depth + 1, &mut children)?;
            }
            out.push(DataNode::container(name, children));
        }
        Json::Array(items) => {
            for item in items {
                match item {
                    Json::Object(map) => {
                        let mut children = Vec::new();
                        for (child_name, child_value) in map {
                            parse_member(child_name, child_value, depth + 1, &mut children)?;
                        }
                        out.push(DataNode::list_entry(name, children));
                    }
                    Json::Array(_) => {
                        return Err(ParseError::json("nested arrays are not representable"))
                    }
                    scalar => {
                        out.push(DataNode::leaf_list_entry(name, parse_scalar(scalar)?));
                    }
                }
            }
        }
        scalar => out.push(DataNode::leaf(name, parse_scalar(scalar)?)),
    }
    Ok(())
}

fn parse_scalar(json: &Json) -> ParseResult<Value> {
    match json {
        Json::Null => Ok(Value::Empty),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Uint(u))
            } else {
                Err(ParseError::FloatForbidden)
            }
        }
        Json::String(s) => Ok(Value::Str(s.clone())),
        _ => Err(ParseError::json("unreachable scalar kind")),
    }
}

fn json_type_name(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// Encodes a tree as compact JSON.
pub(crate) fn serialize(tree: &DataTree) -> Vec<u8> {
    let object = serialize_children(&tree.roots);
    // Serializing an in-memory map cannot fail.
    serde_json::to_vec(&Json::Object(object)).unwrap_or_default()
}

/// Groups same-named siblings into arrays and emits one member per name.
fn serialize_children(children: &[DataNode]) -> Map<String, Json> {
    let mut out = Map::new();
    for node in children {
        if out.contains_key(&node.name) {
            continue; // group already emitted on first encounter
        }
        let group: Vec<&DataNode> = children.iter().filter(|c| c.name == node.name).collect();
        let as_array = group.len() > 1
            || matches!(
                node.kind,
                NodeKind::ListEntry | NodeKind::LeafListEntry
            );
        let member = if as_array {
            Json::Array(group.iter().map(|n| serialize_node(n)).collect())
        } else {
            serialize_node(node)
        };
        out.insert(node.name.clone(), member);
    }
    out
}

fn serialize_node(node: &DataNode) -> Json {
    if node.kind.is_terminal() {
        match &node.value {
            Some(value) => serialize_scalar(value),
            None => Json::Null,
        }
    } else {
        Json::Object(serialize_children(&node.children))
    }
}

fn serialize_scalar(value: &Value) -> Json {
    match value {
        Value::Empty => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::Number(Number::from(*n)),
        Value::Uint(n) => Json::Number(Number::from(*n)),
        Value::Str(s) => Json::String(s.clone()),
        Value::Bytes(_) => Json::String(value.canonical_text()),
    }
}
