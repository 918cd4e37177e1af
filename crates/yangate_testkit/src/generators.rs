//! Property-based generators using proptest.

use proptest::prelude::*;
use yangate_tree::{DataNode, DataTree, Value};

/// Strategy for node and leaf names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,15}").expect("invalid regex")
}

/// Strategy for scalar values, covering the full `Value` range.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Empty),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        // Only the upper half of the u64 range stays Uint in canonical form.
        ((i64::MAX as u64 + 1)..=u64::MAX).prop_map(Value::Uint),
        "[ -~]{0,32}".prop_map(Value::Str),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
    ]
}

/// Strategy for a flat forest of uniquely-named leaves.
pub fn leaf_forest_strategy() -> impl Strategy<Value = DataTree> {
    prop::collection::btree_map(name_strategy(), value_strategy(), 0..8).prop_map(|leaves| {
        DataTree::new(
            leaves
                .into_iter()
                .map(|(name, value)| DataNode::leaf(name, value))
                .collect(),
        )
    })
}

/// Strategy for small nested trees: containers of leaves under one root.
pub fn nested_tree_strategy() -> impl Strategy<Value = DataTree> {
    prop::collection::btree_map(
        name_strategy(),
        prop::collection::btree_map(name_strategy(), value_strategy(), 0..4),
        1..4,
    )
    .prop_map(|containers| {
        DataTree::new(
            containers
                .into_iter()
                .map(|(name, leaves)| {
                    DataNode::container(
                        name,
                        leaves
                            .into_iter()
                            .map(|(leaf, value)| DataNode::leaf(leaf, value))
                            .collect(),
                    )
                })
                .collect(),
        )
    })
}
