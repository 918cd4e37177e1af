//! Canned registries and engines with automatic cleanup.

use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use yangate_engine::{ConfigEngine, EngineConfig};
use yangate_schema::SchemaRegistry;

/// Source text of the canned `interfaces` module.
///
/// A small interfaces-style module: keyed interface list with config and
/// state leaves, a defaulted `mtu`, and a `system-restart` RPC.
pub const INTERFACES_MODULE: &str = r#"{
    "name": "interfaces",
    "organization": "Example Networks",
    "revision": "2026-01-15",
    "features": ["vlan"],
    "nodes": [
        { "path": "/interfaces", "kind": "container" },
        { "path": "/interfaces/interface", "kind": "list", "keys": ["name"] },
        { "path": "/interfaces/interface/name", "kind": "leaf",
          "type": { "base": "string" }, "mandatory": true },
        { "path": "/interfaces/interface/enabled", "kind": "leaf",
          "type": { "base": "boolean" } },
        { "path": "/interfaces/interface/mtu", "kind": "leaf",
          "type": { "base": "uint", "min": 68, "max": 9216 }, "default": "1500" },
        { "path": "/interfaces/interface/description", "kind": "leaf",
          "type": { "base": "string" } },
        { "path": "/interfaces/interface/oper-status", "kind": "leaf",
          "type": { "base": "enumeration", "values": ["up", "down", "testing"] },
          "config": false },
        { "path": "/system-restart", "kind": "rpc" },
        { "path": "/system-restart/input", "kind": "container" },
        { "path": "/system-restart/input/delay", "kind": "leaf",
          "type": { "base": "uint" } },
        { "path": "/system-restart/output", "kind": "container" },
        { "path": "/system-restart/output/message", "kind": "leaf",
          "type": { "base": "string" } }
    ],
    "rpcs": ["/system-restart"]
}"#;

/// A registry with the canned `interfaces` module loaded.
pub fn test_registry() -> Arc<SchemaRegistry> {
    let registry = SchemaRegistry::new();
    registry
        .load_module(INTERFACES_MODULE)
        .expect("canned module must load");
    Arc::new(registry)
}

/// A test engine with automatic cleanup.
pub struct TestEngine {
    /// The engine instance.
    pub engine: ConfigEngine,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestEngine {
    /// An in-memory engine over the canned registry.
    pub fn memory() -> Self {
        Self {
            engine: ConfigEngine::open_in_memory(EngineConfig::default(), test_registry())
                .expect("failed to open in-memory engine"),
            temp_dir: None,
        }
    }

    /// A file-backed engine in a fresh temp directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let engine = ConfigEngine::open(
            &temp_dir.path().join("rollback.log"),
            EngineConfig::default(),
            test_registry(),
        )
        .expect("failed to open file engine");
        Self {
            engine,
            temp_dir: Some(temp_dir),
        }
    }

    /// The rollback log path, for file-backed engines.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.temp_dir
            .as_ref()
            .map(|d| d.path().join("rollback.log"))
    }
}

impl std::ops::Deref for TestEngine {
    type Target = ConfigEngine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

/// Runs a test with a temporary in-memory engine.
pub fn with_temp_engine<F, R>(f: F) -> R
where
    F: FnOnce(&ConfigEngine) -> R,
{
    let test_engine = TestEngine::memory();
    f(&test_engine.engine)
}
