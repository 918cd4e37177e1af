//! Read-side views of the running configuration.

use yangate_schema::SchemaRegistry;
use yangate_tree::{DataNode, DataTree};

/// Which class of data a read should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    /// Configuration and state data.
    #[default]
    All,
    /// Configuration data only (`config true` in the schema).
    Config,
    /// State data only, with its enclosing hierarchy.
    State,
}

/// Filters a tree down to the requested data class.
///
/// Interior nodes survive when any descendant survives, so state leaves
/// keep their enclosing containers even when those are `config true`.
pub(crate) fn filter_tree(tree: &DataTree, data_type: DataType, registry: &SchemaRegistry) -> DataTree {
    if data_type == DataType::All {
        return tree.clone();
    }
    let roots = tree
        .roots
        .iter()
        .filter_map(|node| filter_node(node, "", data_type, registry))
        .collect();
    DataTree::new(roots)
}

fn filter_node(
    node: &DataNode,
    parent_path: &str,
    data_type: DataType,
    registry: &SchemaRegistry,
) -> Option<DataNode> {
    let path = format!("{parent_path}/{}", node.name);
    // Unresolvable nodes are treated as config data.
    let is_config = registry.resolve_path(&path).map_or(true, |s| s.config);

    if node.kind.is_terminal() {
        let keep = match data_type {
            DataType::All => true,
            DataType::Config => is_config,
            DataType::State => !is_config,
        };
        return keep.then(|| node.clone());
    }

    let children: Vec<DataNode> = node
        .children
        .iter()
        .filter_map(|c| filter_node(c, &path, data_type, registry))
        .collect();

    let keep = match data_type {
        DataType::All => true,
        // An interior node stands on its own config class only when it had
        // no children to begin with; otherwise its children decide.
        DataType::Config => !children.is_empty() || (node.children.is_empty() && is_config),
        DataType::State => !children.is_empty() || (node.children.is_empty() && !is_config),
    };
    keep.then(|| {
        let mut filtered = node.clone();
        filtered.children = children;
        filtered
    })
}
