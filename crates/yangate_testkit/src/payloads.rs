//! Sample encoded payloads for codec and boundary tests.

use crate::builders::interfaces_tree;
use yangate_tree::{DataTree, Encoding};

/// JSON rendering of [`interfaces_tree`].
pub const INTERFACES_JSON: &str = r#"{
  "interfaces": {
    "interface": [
      { "name": "eth0", "enabled": true }
    ]
  }
}"#;

/// XML rendering of [`interfaces_tree`].
pub const INTERFACES_XML: &str = "<data><interfaces><interface>\
<name>eth0</name><enabled>true</enabled>\
</interface></interfaces></data>";

/// The binary rendering of [`interfaces_tree`].
pub fn interfaces_binary() -> Vec<u8> {
    interfaces_tree().serialize(Encoding::Binary)
}
