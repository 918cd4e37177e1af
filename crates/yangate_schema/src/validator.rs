//! Candidate tree validation and normalization.
//!
//! Validation runs in a fixed order: path resolution, list-key and
//! mandatory-leaf constraints, leaf type conformance, then the pluggable
//! per-path constraint checks. It is a pure function over a tree snapshot.

use crate::error::{ValidationError, ValidationResult};
use crate::module::{LeafType, SchemaNodeKind};
use crate::registry::SchemaRegistry;
use std::collections::HashSet;
use yangate_tree::{DataNode, DataTree, NodeKind, Value};

/// Validates a candidate tree against the registry.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, carrying the data path of
/// the offending node and the reason.
pub fn validate(tree: &DataTree, registry: &SchemaRegistry) -> ValidationResult<()> {
    walk_validate(&tree.roots, "", "", tree, registry)
}

fn walk_validate(
    children: &[DataNode],
    schema_path: &str,
    instance_path: &str,
    tree: &DataTree,
    registry: &SchemaRegistry,
) -> ValidationResult<()> {
    // (b) key uniqueness among same-named list entries at this level.
    check_key_uniqueness(children, schema_path, instance_path, registry)?;
    // (b) mandatory children of this instance.
    check_mandatory(children, schema_path, instance_path, registry)?;

    for node in children {
        let child_schema_path = join(schema_path, &node.name);
        let child_instance_path = instance_display(instance_path, node);

        // (a) resolution.
        let Some(schema) = registry.resolve_path(&child_schema_path) else {
            return Err(ValidationError::new(
                child_instance_path,
                "node does not resolve against the loaded schema",
            ));
        };

        if schema.kind == SchemaNodeKind::Anydata {
            continue; // opaque subtree, not interpreted
        }

        // (c) leaf type conformance.
        if matches!(schema.kind, SchemaNodeKind::Leaf | SchemaNodeKind::LeafList) {
            let value = node.value.as_ref().ok_or_else(|| {
                ValidationError::new(&child_instance_path, "leaf without a value")
            })?;
            if !node.children.is_empty() {
                return Err(ValidationError::new(
                    &child_instance_path,
                    "leaf with child nodes",
                ));
            }
            if let Some(leaf_type) = &schema.leaf_type {
                coerce_value(leaf_type, value)
                    .map_err(|reason| ValidationError::new(&child_instance_path, reason))?;
            }
        } else if node.value.is_some() {
            return Err(ValidationError::new(
                &child_instance_path,
                "interior node carrying a scalar value",
            ));
        }

        // (d) pluggable per-path semantic constraints.
        for check in registry.constraints_for(&child_schema_path) {
            check
                .check(node, tree)
                .map_err(|reason| ValidationError::new(&child_instance_path, reason))?;
        }

        walk_validate(
            &node.children,
            &child_schema_path,
            &child_instance_path,
            tree,
            registry,
        )?;
    }
    Ok(())
}

fn check_key_uniqueness(
    children: &[DataNode],
    schema_path: &str,
    instance_path: &str,
    registry: &SchemaRegistry,
) -> ValidationResult<()> {
    let mut checked: HashSet<&str> = HashSet::new();
    for node in children {
        if !checked.insert(node.name.as_str()) {
            continue;
        }
        let child_schema_path = join(schema_path, &node.name);
        let Some(schema) = registry.resolve_path(&child_schema_path) else {
            continue; // resolution failure reported by the main walk
        };
        if schema.kind != SchemaNodeKind::List {
            continue;
        }
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        for entry in children.iter().filter(|c| c.name == node.name) {
            let mut tuple = Vec::with_capacity(schema.keys.len());
            for key in &schema.keys {
                let value = entry.leaf_value(key).ok_or_else(|| {
                    ValidationError::new(
                        instance_display(instance_path, entry),
                        format!("list entry missing key leaf {key}"),
                    )
                })?;
                tuple.push(value.canonical_text());
            }
            if !seen.insert(tuple) {
                return Err(ValidationError::new(
                    instance_display(instance_path, entry),
                    "duplicate list entry key",
                ));
            }
        }
    }
    Ok(())
}

fn check_mandatory(
    children: &[DataNode],
    schema_path: &str,
    instance_path: &str,
    registry: &SchemaRegistry,
) -> ValidationResult<()> {
    // Mandatory leaves are only required inside instances that exist; the
    // top level and each present container/list entry are such instances.
    let lookup = if schema_path.is_empty() { "/" } else { schema_path };
    for child_schema in registry.children_of(lookup) {
        if !child_schema.mandatory {
            continue;
        }
        let name = child_schema.local_name();
        if !children.iter().any(|c| c.name == name) {
            let shown = if instance_path.is_empty() { "/" } else { instance_path };
            return Err(ValidationError::new(
                shown,
                format!("mandatory node {name} is missing"),
            ));
        }
    }
    Ok(())
}

/// Normalizes a tree against the schema: node kinds are re-tagged from the
/// schema (text encodings cannot distinguish containers from single-entry
/// lists) and leaf values are coerced to their schema types.
///
/// # Errors
///
/// Fails with a [`ValidationError`] on unresolvable nodes or uncoercible
/// values; normalization never partially applies.
pub fn normalize(tree: &DataTree, registry: &SchemaRegistry) -> ValidationResult<DataTree> {
    let mut out = tree.clone();
    out.source_encoding = None;
    normalize_children(&mut out.roots, "", "", registry)?;
    Ok(out)
}

fn normalize_children(
    children: &mut [DataNode],
    schema_path: &str,
    instance_path: &str,
    registry: &SchemaRegistry,
) -> ValidationResult<()> {
    for node in children.iter_mut() {
        let child_schema_path = join(schema_path, &node.name);
        let child_instance_path = instance_display(instance_path, node);
        let Some(schema) = registry.resolve_path(&child_schema_path) else {
            return Err(ValidationError::new(
                child_instance_path,
                "node does not resolve against the loaded schema",
            ));
        };
        match schema.kind {
            SchemaNodeKind::Anydata => {
                node.kind = NodeKind::Anydata;
                continue;
            }
            SchemaNodeKind::Container | SchemaNodeKind::Rpc => node.kind = NodeKind::Container,
            SchemaNodeKind::List => node.kind = NodeKind::ListEntry,
            SchemaNodeKind::Leaf => node.kind = NodeKind::Leaf,
            SchemaNodeKind::LeafList => node.kind = NodeKind::LeafListEntry,
        }
        if let (Some(leaf_type), Some(value)) = (&schema.leaf_type, &node.value) {
            let coerced = coerce_value(leaf_type, value)
                .map_err(|reason| ValidationError::new(&child_instance_path, reason))?;
            node.value = Some(coerced);
        }
        normalize_children(
            &mut node.children,
            &child_schema_path,
            &child_instance_path,
            registry,
        )?;
    }
    Ok(())
}

/// Inserts schema default values for absent leaves, recursively.
///
/// Only descends into instances that exist; it never conjures containers.
#[must_use]
pub fn fill_defaults(tree: &DataTree, registry: &SchemaRegistry) -> DataTree {
    let mut out = tree.clone();
    fill_children(&mut out.roots, "/", registry);
    out
}

fn fill_children(children: &mut Vec<DataNode>, schema_path: &str, registry: &SchemaRegistry) {
    for child_schema in registry.children_of(schema_path) {
        let Some(default) = &child_schema.default else {
            continue;
        };
        let name = child_schema.local_name();
        if children.iter().any(|c| c.name == name) {
            continue;
        }
        let value = child_schema
            .leaf_type
            .as_ref()
            .and_then(|t| coerce_value(t, &Value::Str(default.clone())).ok())
            .unwrap_or_else(|| Value::Str(default.clone()));
        children.push(DataNode::leaf(name, value));
    }
    for node in children.iter_mut() {
        if node.kind.is_terminal() || node.kind == NodeKind::Anydata {
            continue;
        }
        let child_schema_path = join(
            if schema_path == "/" { "" } else { schema_path },
            &node.name,
        );
        fill_children(&mut node.children, &child_schema_path, registry);
    }
}

/// Coerces a value to a leaf type, returning the canonical in-memory form.
///
/// Text encodings deliver every scalar as a string; this is where those
/// strings become typed values. Already-typed values are range-checked.
fn coerce_value(leaf_type: &LeafType, value: &Value) -> Result<Value, String> {
    use base64::Engine as _;
    match leaf_type {
        LeafType::String => match value {
            Value::Str(_) => Ok(value.clone()),
            other => Err(format!("expected string, got {}", other.type_name())),
        },
        LeafType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Str(s) if s == "true" => Ok(Value::Bool(true)),
            Value::Str(s) if s == "false" => Ok(Value::Bool(false)),
            other => Err(format!("expected boolean, got {}", other.type_name())),
        },
        LeafType::Empty => match value {
            Value::Empty => Ok(Value::Empty),
            Value::Str(s) if s.is_empty() => Ok(Value::Empty),
            other => Err(format!("expected empty, got {}", other.type_name())),
        },
        LeafType::Binary => match value {
            Value::Bytes(_) => Ok(value.clone()),
            Value::Str(s) => base64::engine::general_purpose::STANDARD
                .decode(s)
                .map(Value::Bytes)
                .map_err(|_| "invalid base64 in binary leaf".to_string()),
            other => Err(format!("expected binary, got {}", other.type_name())),
        },
        LeafType::Decimal => match value {
            Value::Str(s) if is_decimal(s) => Ok(value.clone()),
            Value::Int(n) => Ok(Value::Str(n.to_string())),
            Value::Uint(n) => Ok(Value::Str(n.to_string())),
            Value::Str(_) => Err("malformed decimal value".to_string()),
            other => Err(format!("expected decimal, got {}", other.type_name())),
        },
        LeafType::Int { min, max } => {
            let n = match value {
                Value::Int(n) => *n,
                Value::Uint(u) => i64::try_from(*u)
                    .map_err(|_| format!("value {u} overflows signed integer"))?,
                Value::Str(s) => s
                    .parse::<i64>()
                    .map_err(|_| format!("cannot parse {s:?} as integer"))?,
                other => return Err(format!("expected integer, got {}", other.type_name())),
            };
            if min.is_some_and(|lo| n < lo) || max.is_some_and(|hi| n > hi) {
                return Err(format!("value {n} outside permitted range"));
            }
            Ok(Value::Int(n))
        }
        LeafType::Uint { min, max } => {
            let n = match value {
                Value::Uint(n) => *n,
                Value::Int(i) => u64::try_from(*i)
                    .map_err(|_| format!("negative value {i} for unsigned leaf"))?,
                Value::Str(s) => s
                    .parse::<u64>()
                    .map_err(|_| format!("cannot parse {s:?} as unsigned integer"))?,
                other => {
                    return Err(format!("expected unsigned integer, got {}", other.type_name()))
                }
            };
            if min.is_some_and(|lo| n < lo) || max.is_some_and(|hi| n > hi) {
                return Err(format!("value {n} outside permitted range"));
            }
            Ok(Value::from(n))
        }
        LeafType::Enumeration { values } => match value {
            Value::Str(s) if values.contains(s) => Ok(value.clone()),
            Value::Str(s) => Err(format!("{s:?} is not a permitted enumeration value")),
            other => Err(format!("expected enumeration, got {}", other.type_name())),
        },
    }
}

fn is_decimal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    if body.is_empty() {
        return false;
    }
    match body.split_once('.') {
        Some((whole, frac)) => {
            !whole.is_empty()
                && !frac.is_empty()
                && whole.chars().all(|c| c.is_ascii_digit())
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        None => body.chars().all(|c| c.is_ascii_digit()),
    }
}

fn join(parent: &str, name: &str) -> String {
    format!("{parent}/{name}")
}

fn instance_display(parent: &str, node: &DataNode) -> String {
    let mut out = format!("{parent}/{}", node.name);
    if node.kind == NodeKind::ListEntry {
        // Best-effort key rendering for diagnostics.
        if let Some(first_leaf) = node.children.iter().find(|c| c.kind == NodeKind::Leaf) {
            if let Some(value) = &first_leaf.value {
                out.push_str(&format!("[{}={}]", first_leaf.name, value.canonical_text()));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaRegistry;
    use yangate_tree::{DataTree, Encoding};

    fn registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry
            .load_module(
                r#"{
                "name": "interfaces",
                "revision": "2026-01-15",
                "nodes": [
                    { "path": "/interfaces", "kind": "container" },
                    { "path": "/interfaces/interface", "kind": "list", "keys": ["name"] },
                    { "path": "/interfaces/interface/name", "kind": "leaf",
                      "type": { "base": "string" }, "mandatory": true },
                    { "path": "/interfaces/interface/enabled", "kind": "leaf",
                      "type": { "base": "boolean" }, "default": "true" },
                    { "path": "/interfaces/interface/mtu", "kind": "leaf",
                      "type": { "base": "uint", "min": 68, "max": 9216 } }
                ]
            }"#,
            )
            .unwrap();
        registry
    }

    fn parse_json(text: &str) -> DataTree {
        DataTree::parse(text.as_bytes(), Encoding::Json).unwrap()
    }

    #[test]
    fn valid_tree_passes() {
        let tree = parse_json(
            r#"{"interfaces":{"interface":[{"name":"eth0","enabled":true,"mtu":1500}]}}"#,
        );
        validate(&tree, &registry()).unwrap();
    }

    #[test]
    fn unknown_node_rejected() {
        let tree = parse_json(r#"{"interfaces":{"bogus":1}}"#);
        let err = validate(&tree, &registry()).unwrap_err();
        assert!(err.path.contains("bogus"));
    }

    #[test]
    fn wrong_leaf_type_rejected() {
        let tree = parse_json(
            r#"{"interfaces":{"interface":[{"name":"eth0","mtu":"jumbo"}]}}"#,
        );
        let err = validate(&tree, &registry()).unwrap_err();
        assert!(err.reason.contains("jumbo"));
    }

    #[test]
    fn range_violation_rejected() {
        let tree = parse_json(
            r#"{"interfaces":{"interface":[{"name":"eth0","mtu":20}]}}"#,
        );
        assert!(validate(&tree, &registry()).is_err());
    }

    #[test]
    fn missing_key_leaf_rejected() {
        let tree = parse_json(r#"{"interfaces":{"interface":[{"mtu":1500}]}}"#);
        let err = validate(&tree, &registry()).unwrap_err();
        assert!(err.reason.contains("missing key leaf name") || err.reason.contains("mandatory"));
    }

    #[test]
    fn duplicate_list_keys_rejected() {
        let tree = parse_json(
            r#"{"interfaces":{"interface":[{"name":"eth0"},{"name":"eth0"}]}}"#,
        );
        let err = validate(&tree, &registry()).unwrap_err();
        assert!(err.reason.contains("duplicate"));
    }

    #[test]
    fn constraint_checks_run_last() {
        struct MtuEven;
        impl crate::registry::ConstraintCheck for MtuEven {
            fn check(&self, node: &DataNode, _tree: &DataTree) -> Result<(), String> {
                match node.value.as_ref().and_then(|v| v.as_u64()) {
                    Some(n) if n % 2 == 0 => Ok(()),
                    _ => Err("mtu must be even".to_string()),
                }
            }
        }
        let registry = registry();
        registry.register_constraint("/interfaces/interface/mtu", std::sync::Arc::new(MtuEven));

        let ok = parse_json(
            r#"{"interfaces":{"interface":[{"name":"eth0","mtu":1500}]}}"#,
        );
        validate(&ok, &registry).unwrap();

        let bad = parse_json(
            r#"{"interfaces":{"interface":[{"name":"eth0","mtu":1501}]}}"#,
        );
        let err = validate(&bad, &registry).unwrap_err();
        assert!(err.reason.contains("even"));
    }

    #[test]
    fn normalize_types_xml_sourced_values() {
        let tree = DataTree::parse(
            b"<data><interfaces><interface><name>eth0</name><enabled>true</enabled>\
              <mtu>9000</mtu></interface></interfaces></data>",
            Encoding::Xml,
        )
        .unwrap();
        let registry = registry();
        let normalized = normalize(&tree, &registry).unwrap();
        let typed = parse_json(
            r#"{"interfaces":{"interface":[{"name":"eth0","enabled":true,"mtu":9000}]}}"#,
        );
        let typed = normalize(&typed, &registry).unwrap();
        assert!(normalized.equivalent(&typed));
    }

    #[test]
    fn normalize_rejects_bad_values() {
        let tree = parse_json(
            r#"{"interfaces":{"interface":[{"name":"eth0","enabled":"maybe"}]}}"#,
        );
        assert!(normalize(&tree, &registry()).is_err());
    }

    #[test]
    fn fill_defaults_inserts_absent_leaves_only() {
        let registry = registry();
        let tree = normalize(
            &parse_json(r#"{"interfaces":{"interface":[{"name":"eth0"}]}}"#),
            &registry,
        )
        .unwrap();
        let filled = fill_defaults(&tree, &registry);
        let entry = &filled.roots[0].children[0];
        assert_eq!(entry.leaf_value("enabled"), Some(&Value::Bool(true)));

        let explicit = normalize(
            &parse_json(r#"{"interfaces":{"interface":[{"name":"eth0","enabled":false}]}}"#),
            &registry,
        )
        .unwrap();
        let filled = fill_defaults(&explicit, &registry);
        assert_eq!(
            filled.roots[0].children[0].leaf_value("enabled"),
            Some(&Value::Bool(false))
        );
    }
}
