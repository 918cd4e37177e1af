//! Wire form of change patches.
//!
//! A `Commit` with the `Change` operation carries its ordered operations
//! as a tree, so all three operations share the one payload shape:
//!
//! ```json
//! {
//!   "changes": {
//!     "change": [
//!       { "op": "replace",
//!         "path": "/interfaces/interface[name=eth0]/enabled",
//!         "value": { "enabled": false } },
//!       { "op": "delete",
//!         "path": "/interfaces/interface[name=eth1]" },
//!       { "op": "move",
//!         "path": "/interfaces/interface[name=eth2]",
//!         "to": "/backup/interface[name=eth2]" }
//!     ]
//!   }
//! }
//! ```

use crate::error::{ServiceError, ServiceResult};
use yangate_tree::{ChangeOp, DataNode, DataTree, Path};

/// Decodes a change-list tree into the ordered operations it describes.
///
/// # Errors
///
/// `InvalidArgument` describing the first malformed entry.
pub fn change_ops_from_tree(tree: &DataTree) -> ServiceResult<Vec<ChangeOp>> {
    let [root] = tree.roots.as_slice() else {
        return Err(ServiceError::invalid_argument(
            "change payload must have a single `changes` root",
        ));
    };
    if root.name != "changes" {
        return Err(ServiceError::invalid_argument(format!(
            "change payload root must be `changes`, found `{}`",
            root.name
        )));
    }

    let mut ops = Vec::with_capacity(root.children.len());
    for (index, entry) in root.children.iter().enumerate() {
        if entry.name != "change" {
            return Err(ServiceError::invalid_argument(format!(
                "unexpected `{}` node in change list (entry {index})",
                entry.name
            )));
        }
        ops.push(decode_entry(entry, index)?);
    }
    Ok(ops)
}

fn decode_entry(entry: &DataNode, index: usize) -> ServiceResult<ChangeOp> {
    let op = required_text(entry, "op", index)?;
    let path = parse_path(&required_text(entry, "path", index)?, index)?;

    match op.as_str() {
        "create" => Ok(ChangeOp::Create {
            path,
            node: value_subtree(entry, index)?,
        }),
        "replace" => Ok(ChangeOp::Replace {
            path,
            node: value_subtree(entry, index)?,
        }),
        "delete" => Ok(ChangeOp::Delete { path }),
        "move" => Ok(ChangeOp::Move {
            from: path,
            to: parse_path(&required_text(entry, "to", index)?, index)?,
        }),
        other => Err(ServiceError::invalid_argument(format!(
            "unknown change op `{other}` (entry {index})"
        ))),
    }
}

fn required_text(entry: &DataNode, leaf: &str, index: usize) -> ServiceResult<String> {
    entry
        .leaf_value(leaf)
        .map(|v| v.canonical_text())
        .ok_or_else(|| {
            ServiceError::invalid_argument(format!("change entry {index} is missing `{leaf}`"))
        })
}

fn parse_path(text: &str, index: usize) -> ServiceResult<Path> {
    text.parse().map_err(|err| {
        ServiceError::invalid_argument(format!("bad path in change entry {index}: {err}"))
    })
}

/// The `value` container must hold exactly the one node being written, and
/// that node's name must match the path's last segment (checked later by
/// the patch itself).
fn value_subtree(entry: &DataNode, index: usize) -> ServiceResult<DataNode> {
    let value = entry.child("value").ok_or_else(|| {
        ServiceError::invalid_argument(format!("change entry {index} is missing `value`"))
    })?;
    let [node] = value.children.as_slice() else {
        return Err(ServiceError::invalid_argument(format!(
            "change entry {index} `value` must hold exactly one node"
        )));
    };
    Ok(node.clone())
}
