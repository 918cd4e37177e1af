//! Terse tree construction helpers.

use yangate_tree::{DataNode, DataTree, Value};

/// A container node.
pub fn container(name: &str, children: Vec<DataNode>) -> DataNode {
    DataNode::container(name, children)
}

/// A list entry node.
pub fn list_entry(name: &str, children: Vec<DataNode>) -> DataNode {
    DataNode::list_entry(name, children)
}

/// A leaf node.
pub fn leaf(name: &str, value: impl Into<Value>) -> DataNode {
    DataNode::leaf(name, value)
}

/// A tree from root nodes.
pub fn tree(roots: Vec<DataNode>) -> DataTree {
    DataTree::new(roots)
}

/// One interface entry, as the canned `interfaces` module expects it.
pub fn interface(name: &str, enabled: bool) -> DataNode {
    list_entry(
        "interface",
        vec![leaf("name", name), leaf("enabled", enabled)],
    )
}

/// A configuration with a single enabled `eth0` interface.
pub fn interfaces_tree() -> DataTree {
    tree(vec![container("interfaces", vec![interface("eth0", true)])])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test_registry;
    use yangate_schema::validate;

    #[test]
    fn canned_tree_validates_against_canned_registry() {
        validate(&interfaces_tree(), &test_registry()).unwrap();
    }
}
