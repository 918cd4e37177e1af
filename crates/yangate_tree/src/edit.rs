//! Tree edit operations: merge, replace, change patches, and diff.

use crate::error::{PatchError, PatchResult};
use crate::node::{DataNode, DataTree, NodeKind};
use crate::path::{Path, Segment};

/// Supplies list-key names to edit operations.
///
/// Merging and diffing must pair up list entries across two trees, which
/// requires knowing which leaves are the list's keys. The schema layer
/// implements this trait; [`NoKeys`] is available where no schema is at hand.
pub trait KeyLookup {
    /// Returns the key leaf names for the list at the given schema path
    /// (predicate-free, e.g. `/interfaces/interface`), or `None` if the path
    /// is not a keyed list.
    fn list_keys(&self, schema_path: &str) -> Option<Vec<String>>;
}

/// A [`KeyLookup`] that knows no keys.
///
/// With this lookup, list entries are never paired across trees: merging
/// inserts patch entries that have no structurally identical counterpart and
/// leaves existing entries alone.
pub struct NoKeys;

impl KeyLookup for NoKeys {
    fn list_keys(&self, _schema_path: &str) -> Option<Vec<String>> {
        None
    }
}

/// One operation of an ordered change patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOp {
    /// Insert a new subtree at `path`. Fails if a node already matches.
    Create {
        /// Full path of the node being created.
        path: Path,
        /// The subtree to insert; its root name must match the path's last
        /// segment.
        node: DataNode,
    },
    /// Remove the subtree at `path`. Fails if nothing matches.
    Delete {
        /// Full path of the node being removed.
        path: Path,
    },
    /// Replace the subtree at `path` wholesale. Fails if nothing matches.
    Replace {
        /// Full path of the node being replaced.
        path: Path,
        /// The replacement subtree.
        node: DataNode,
    },
    /// Detach the subtree at `from` and re-attach it under `to`'s parent.
    Move {
        /// Current path of the subtree.
        from: Path,
        /// Destination path; the last segment names the re-attached node.
        to: Path,
    },
}

impl ChangeOp {
    /// The path this operation addresses, for diagnostics.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Create { path, .. } | Self::Delete { path } | Self::Replace { path, .. } => path,
            Self::Move { from, .. } => from,
        }
    }
}

/// Merges `patch` into `base`, returning the merged tree.
///
/// A node present in the patch overwrites or inserts at the corresponding
/// position in the base; base nodes absent from the patch are untouched.
/// List entries are paired by their key leaves per `keys`.
#[must_use]
pub fn merge(base: &DataTree, patch: &DataTree, keys: &dyn KeyLookup) -> DataTree {
    let mut merged = base.clone();
    merged.source_encoding = None;
    merge_children(&mut merged.roots, &patch.roots, "", keys);
    merged
}

/// Replaces `base` entirely with `new`.
#[must_use]
pub fn replace(_base: &DataTree, new: &DataTree) -> DataTree {
    let mut result = new.clone();
    result.source_encoding = None;
    result
}

fn merge_children(
    base: &mut Vec<DataNode>,
    patch: &[DataNode],
    parent_schema_path: &str,
    keys: &dyn KeyLookup,
) {
    for patch_child in patch {
        let child_path = format!("{parent_schema_path}/{}", patch_child.name);
        match patch_child.kind {
            NodeKind::ListEntry => {
                let position = keys.list_keys(&child_path).and_then(|key_names| {
                    base.iter().position(|candidate| {
                        candidate.name == patch_child.name
                            && entry_keys_match(candidate, patch_child, &key_names)
                    })
                });
                match position {
                    Some(idx) => {
                        merge_children(&mut base[idx].children, &patch_child.children, &child_path, keys);
                    }
                    None => {
                        // Unknown keys: only skip insertion for an exact twin.
                        if !base.iter().any(|c| c.equivalent(patch_child)) {
                            base.push(patch_child.clone());
                        }
                    }
                }
            }
            NodeKind::LeafListEntry => {
                let exists = base.iter().any(|c| {
                    c.name == patch_child.name && c.value == patch_child.value
                });
                if !exists {
                    base.push(patch_child.clone());
                }
            }
            NodeKind::Leaf => match base.iter_mut().find(|c| c.name == patch_child.name) {
                Some(existing) => {
                    existing.kind = NodeKind::Leaf;
                    existing.value = patch_child.value.clone();
                    existing.children.clear();
                }
                None => base.push(patch_child.clone()),
            },
            NodeKind::Container | NodeKind::Anydata => {
                match base.iter_mut().find(|c| c.name == patch_child.name) {
                    Some(existing) => {
                        merge_children(&mut existing.children, &patch_child.children, &child_path, keys);
                    }
                    None => base.push(patch_child.clone()),
                }
            }
        }
    }
}

fn entry_keys_match(a: &DataNode, b: &DataNode, key_names: &[String]) -> bool {
    key_names
        .iter()
        .all(|key| match (a.leaf_value(key), b.leaf_value(key)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        })
}

/// Applies an ordered change patch to `base`, returning the edited tree.
///
/// Operations are applied sequentially; the first failure aborts the whole
/// patch and `base` is left untouched (the edit happens on a private clone
/// that is only handed back on full success).
///
/// # Errors
///
/// Returns a [`PatchError`] identifying the failing operation by index.
pub fn apply_change_patch(base: &DataTree, ops: &[ChangeOp]) -> PatchResult<DataTree> {
    let mut tree = base.clone();
    tree.source_encoding = None;
    for (index, op) in ops.iter().enumerate() {
        apply_one(&mut tree, index, op)?;
    }
    Ok(tree)
}

fn apply_one(tree: &mut DataTree, index: usize, op: &ChangeOp) -> PatchResult<()> {
    match op {
        ChangeOp::Create { path, node } => {
            let last = path
                .last()
                .ok_or_else(|| PatchError::new(index, path.to_string(), "cannot create at root"))?
                .clone();
            if node.name != last.name {
                return Err(PatchError::new(
                    index,
                    path.to_string(),
                    format!("node name {:?} does not match path", node.name),
                ));
            }
            let siblings = siblings_at(tree, index, path)?;
            if siblings.iter().any(|c| c.matches_segment(&last)) {
                return Err(PatchError::new(index, path.to_string(), "node already exists"));
            }
            siblings.push(node.clone());
            Ok(())
        }
        ChangeOp::Delete { path } => {
            detach(tree, index, path)?;
            Ok(())
        }
        ChangeOp::Replace { path, node } => {
            let last = path
                .last()
                .ok_or_else(|| PatchError::new(index, path.to_string(), "cannot replace root"))?
                .clone();
            let siblings = siblings_at(tree, index, path)?;
            let position = siblings
                .iter()
                .position(|c| c.matches_segment(&last))
                .ok_or_else(|| PatchError::new(index, path.to_string(), "node not found"))?;
            siblings[position] = node.clone();
            Ok(())
        }
        ChangeOp::Move { from, to } => {
            let node = detach(tree, index, from)?;
            let last = to
                .last()
                .ok_or_else(|| PatchError::new(index, to.to_string(), "cannot move to root"))?
                .clone();
            if node.name != last.name {
                return Err(PatchError::new(
                    index,
                    to.to_string(),
                    "destination segment does not name the moved node",
                ));
            }
            let siblings = siblings_at(tree, index, to)?;
            if siblings.iter().any(|c| c.matches_segment(&last)) {
                return Err(PatchError::new(index, to.to_string(), "destination already exists"));
            }
            siblings.push(node);
            Ok(())
        }
    }
}

/// Resolves the child vector that holds (or would hold) the node at `path`.
fn siblings_at<'t>(
    tree: &'t mut DataTree,
    index: usize,
    path: &Path,
) -> PatchResult<&'t mut Vec<DataNode>> {
    match path.parent() {
        None => Err(PatchError::new(index, path.to_string(), "path addresses the root")),
        Some(parent) if parent.is_root() => Ok(&mut tree.roots),
        Some(parent) => {
            let parent_display = parent.to_string();
            tree.find_mut(&parent)
                .map(|node| &mut node.children)
                .ok_or_else(|| {
                    PatchError::new(index, path.to_string(), format!("parent {parent_display} not found"))
                })
        }
    }
}

fn detach(tree: &mut DataTree, index: usize, path: &Path) -> PatchResult<DataNode> {
    let last = path
        .last()
        .ok_or_else(|| PatchError::new(index, path.to_string(), "cannot detach root"))?
        .clone();
    let siblings = siblings_at(tree, index, path)?;
    let position = siblings
        .iter()
        .position(|c| c.matches_segment(&last))
        .ok_or_else(|| PatchError::new(index, path.to_string(), "node not found"))?;
    Ok(siblings.remove(position))
}

/// Computes a change patch that transforms `base` into `new`.
///
/// The produced operations, applied in order via [`apply_change_patch`],
/// yield a tree equivalent to `new`. List entries are paired by key leaves;
/// unpaired entries become whole-subtree creates/deletes.
#[must_use]
pub fn diff(base: &DataTree, new: &DataTree, keys: &dyn KeyLookup) -> Vec<ChangeOp> {
    let mut ops = Vec::new();
    diff_children(&base.roots, &new.roots, &Path::root(), "", keys, &mut ops);
    ops
}

fn diff_children(
    base: &[DataNode],
    new: &[DataNode],
    parent: &Path,
    parent_schema_path: &str,
    keys: &dyn KeyLookup,
    ops: &mut Vec<ChangeOp>,
) {
    let mut matched_base: Vec<bool> = vec![false; base.len()];

    for new_child in new {
        let child_schema_path = format!("{parent_schema_path}/{}", new_child.name);
        let pairing = find_counterpart(base, new_child, &child_schema_path, keys);
        let child_path = child_path(parent, new_child, &child_schema_path, keys);
        match pairing {
            Some(idx) => {
                matched_base[idx] = true;
                let base_child = &base[idx];
                if new_child.kind.is_terminal() || base_child.kind.is_terminal() {
                    if !base_child.equivalent(new_child) {
                        ops.push(ChangeOp::Replace {
                            path: child_path,
                            node: new_child.clone(),
                        });
                    }
                } else {
                    diff_children(
                        &base_child.children,
                        &new_child.children,
                        &child_path,
                        &child_schema_path,
                        keys,
                        ops,
                    );
                }
            }
            None => ops.push(ChangeOp::Create {
                path: child_path,
                node: new_child.clone(),
            }),
        }
    }

    for (idx, base_child) in base.iter().enumerate() {
        if !matched_base[idx] {
            let child_schema_path = format!("{parent_schema_path}/{}", base_child.name);
            ops.push(ChangeOp::Delete {
                path: child_path(parent, base_child, &child_schema_path, keys),
            });
        }
    }
}

/// Finds the base child that corresponds to `node`, by name for singletons
/// and by key leaves for list entries.
fn find_counterpart(
    base: &[DataNode],
    node: &DataNode,
    schema_path: &str,
    keys: &dyn KeyLookup,
) -> Option<usize> {
    match node.kind {
        NodeKind::ListEntry => {
            let key_names = keys.list_keys(schema_path);
            base.iter().position(|c| {
                c.name == node.name
                    && match &key_names {
                        Some(names) => entry_keys_match(c, node, names),
                        None => c.equivalent(node),
                    }
            })
        }
        NodeKind::LeafListEntry => base
            .iter()
            .position(|c| c.name == node.name && c.value == node.value),
        _ => base.iter().position(|c| c.name == node.name),
    }
}

/// Builds the addressable path of a child, attaching key predicates for
/// list entries so the resulting ops resolve unambiguously.
fn child_path(
    parent: &Path,
    node: &DataNode,
    schema_path: &str,
    keys: &dyn KeyLookup,
) -> Path {
    let mut segment = Segment::named(node.name.clone());
    match node.kind {
        NodeKind::ListEntry => {
            let key_names = keys
                .list_keys(schema_path)
                .unwrap_or_else(|| {
                    // No schema keys: predicate on every direct leaf.
                    node.children
                        .iter()
                        .filter(|c| c.kind == NodeKind::Leaf)
                        .map(|c| c.name.clone())
                        .collect()
                });
            for key in key_names {
                if let Some(value) = node.leaf_value(&key) {
                    segment.predicates.push((key, value.canonical_text()));
                }
            }
        }
        NodeKind::LeafListEntry => {
            if let Some(value) = &node.value {
                // Self-predicate so deletes hit the right entry.
                segment
                    .predicates
                    .push((node.name.clone(), value.canonical_text()));
            }
        }
        _ => {}
    }
    let mut segments = parent.segments.clone();
    segments.push(segment);
    Path::new(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    struct InterfaceKeys;

    impl KeyLookup for InterfaceKeys {
        fn list_keys(&self, schema_path: &str) -> Option<Vec<String>> {
            (schema_path == "/interfaces/interface").then(|| vec!["name".to_string()])
        }
    }

    fn interface(name: &str, mtu: u64) -> DataNode {
        DataNode::list_entry(
            "interface",
            vec![DataNode::leaf("name", name), DataNode::leaf("mtu", mtu)],
        )
    }

    fn interfaces(entries: Vec<DataNode>) -> DataTree {
        DataTree::new(vec![DataNode::container("interfaces", entries)])
    }

    #[test]
    fn merge_overwrites_leaf() {
        let base = DataTree::new(vec![DataNode::leaf("hostname", "r1")]);
        let patch = DataTree::new(vec![DataNode::leaf("hostname", "r2")]);
        let merged = merge(&base, &patch, &NoKeys);
        assert_eq!(
            merged.roots[0].value,
            Some(Value::Str("r2".into()))
        );
    }

    #[test]
    fn merge_inserts_missing_subtree() {
        let base = DataTree::new(vec![DataNode::leaf("hostname", "r1")]);
        let patch = DataTree::new(vec![DataNode::container(
            "system",
            vec![DataNode::leaf("domain", "lab")],
        )]);
        let merged = merge(&base, &patch, &NoKeys);
        assert_eq!(merged.roots.len(), 2);
        assert!(merged.find(&"/system/domain".parse().unwrap()).is_some());
    }

    #[test]
    fn merge_pairs_list_entries_by_key() {
        let base = interfaces(vec![interface("eth0", 1500), interface("eth1", 1500)]);
        let patch = interfaces(vec![interface("eth0", 9000)]);
        let merged = merge(&base, &patch, &InterfaceKeys);

        let eth0 = merged
            .find(&"/interfaces/interface[name=eth0]/mtu".parse().unwrap())
            .unwrap();
        assert_eq!(eth0.value, Some(Value::Int(9000)));
        // eth1 untouched, no duplicate eth0.
        assert_eq!(merged.roots[0].children.len(), 2);
    }

    #[test]
    fn merge_without_keys_never_duplicates_identical_entries() {
        let base = interfaces(vec![interface("eth0", 1500)]);
        let patch = interfaces(vec![interface("eth0", 1500)]);
        let merged = merge(&base, &patch, &NoKeys);
        assert_eq!(merged.roots[0].children.len(), 1);
    }

    #[test]
    fn replace_supersedes_base() {
        let base = interfaces(vec![interface("eth0", 1500)]);
        let new = DataTree::new(vec![DataNode::leaf("hostname", "r9")]);
        let replaced = replace(&base, &new);
        assert!(replaced.equivalent(&new));
    }

    #[test]
    fn change_patch_applies_in_order() {
        let base = interfaces(vec![interface("eth0", 1500)]);
        let ops = vec![
            ChangeOp::Create {
                path: "/interfaces/interface[name=eth1]".parse().unwrap(),
                node: interface("eth1", 1500),
            },
            ChangeOp::Replace {
                path: "/interfaces/interface[name=eth0]/mtu".parse().unwrap(),
                node: DataNode::leaf("mtu", 9000u64),
            },
        ];
        let patched = apply_change_patch(&base, &ops).unwrap();
        assert_eq!(patched.roots[0].children.len(), 2);
        let mtu = patched
            .find(&"/interfaces/interface[name=eth0]/mtu".parse().unwrap())
            .unwrap();
        assert_eq!(mtu.value, Some(Value::Int(9000)));
    }

    #[test]
    fn change_patch_aborts_wholesale() {
        let base = interfaces(vec![interface("eth0", 1500)]);
        let ops = vec![
            ChangeOp::Delete {
                path: "/interfaces/interface[name=eth0]".parse().unwrap(),
            },
            ChangeOp::Delete {
                path: "/interfaces/interface[name=missing]".parse().unwrap(),
            },
        ];
        let err = apply_change_patch(&base, &ops).unwrap_err();
        assert_eq!(err.index, 1);
        // Base untouched despite the first op having been applicable.
        assert_eq!(base.roots[0].children.len(), 1);
    }

    #[test]
    fn create_rejects_duplicate() {
        let base = interfaces(vec![interface("eth0", 1500)]);
        let ops = vec![ChangeOp::Create {
            path: "/interfaces/interface[name=eth0]".parse().unwrap(),
            node: interface("eth0", 9000),
        }];
        let err = apply_change_patch(&base, &ops).unwrap_err();
        assert_eq!(err.index, 0);
    }

    #[test]
    fn diff_then_apply_reproduces_target() {
        let base = interfaces(vec![interface("eth0", 1500), interface("eth1", 1500)]);
        let target = interfaces(vec![
            interface("eth0", 9000),
            interface("eth2", 1500),
        ]);
        let ops = diff(&base, &target, &InterfaceKeys);
        let rebuilt = apply_change_patch(&base, &ops).unwrap();
        assert!(rebuilt.equivalent(&target));
    }

    #[test]
    fn diff_of_identical_trees_is_empty() {
        let base = interfaces(vec![interface("eth0", 1500)]);
        assert!(diff(&base, &base.clone(), &InterfaceKeys).is_empty());
    }
}
