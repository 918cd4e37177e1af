//! The schema registry.

use crate::error::{SchemaError, SchemaResult};
use crate::module::{ModuleData, NodeSchema, SchemaNodeKind};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use yangate_tree::{DataNode, DataTree, KeyLookup};

/// A pluggable semantic constraint attached to a schema path
/// (the "must"-style checks of the validation pipeline).
pub trait ConstraintCheck: Send + Sync {
    /// Checks the node instance against the whole candidate tree.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the constraint is violated.
    fn check(&self, node: &DataNode, tree: &DataTree) -> Result<(), String>;
}

/// Failure reported by an RPC/action handler body.
#[derive(Debug, Clone, Error)]
#[error("rpc handler failed: {message}")]
pub struct RpcHandlerError {
    /// Description of the failure.
    pub message: String,
}

impl RpcHandlerError {
    /// Creates a handler error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Executes the body of an RPC or action.
///
/// Handlers receive the validated invocation subtree and a read-only
/// snapshot of the running configuration; they return the output parameter
/// nodes to graft under the invocation. They never see a mutable tree.
pub trait RpcHandler: Send + Sync {
    /// Runs the RPC/action.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcHandlerError`] describing the failure.
    fn invoke(
        &self,
        invocation: &DataNode,
        running: &DataTree,
    ) -> Result<Vec<DataNode>, RpcHandlerError>;
}

#[derive(Default)]
struct Inner {
    /// (name, revision) -> module, ordered for stable listing.
    modules: BTreeMap<(String, String), ModuleData>,
    /// Original source text per module, served by GetSchema.
    sources: BTreeMap<(String, String), String>,
    /// Absolute schema path -> node metadata, across all modules.
    paths: HashMap<String, NodeSchema>,
    /// Schema path -> direct child paths, for mandatory/default walks.
    children: HashMap<String, Vec<String>>,
    /// RPC/action head paths.
    rpcs: Vec<String>,
}

/// Holds the loaded schema modules and resolves data paths to node
/// metadata.
///
/// Read-mostly after startup; all methods take `&self` so the registry can
/// be shared behind an `Arc` between the validator, the engine, and the
/// northbound service. Constraint checks and RPC handlers are registered
/// here at load time (capability-table dispatch, keyed by schema path).
#[derive(Default)]
pub struct SchemaRegistry {
    inner: RwLock<Inner>,
    constraints: RwLock<HashMap<String, Vec<Arc<dyn ConstraintCheck>>>>,
    handlers: RwLock<HashMap<String, Arc<dyn RpcHandler>>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a module from its declarative JSON source.
    ///
    /// Idempotent per (name, revision): re-loading an already-present
    /// revision returns the existing module unchanged. A module with unmet
    /// imports or inconsistent node schemas fails without registering
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] on malformed source, unresolved imports,
    /// or conflicting schema paths.
    pub fn load_module(&self, source: &str) -> SchemaResult<ModuleData> {
        let module =
            ModuleData::from_source(source).map_err(|e| SchemaError::bad_source(e.to_string()))?;

        let mut inner = self.inner.write();
        let key = (module.name.clone(), module.revision.clone());
        if let Some(existing) = inner.modules.get(&key) {
            return Ok(existing.clone());
        }

        for import in &module.imports {
            let loaded = inner.modules.keys().any(|(name, _)| name == import);
            if !loaded {
                return Err(SchemaError::UnresolvedImport {
                    module: module.name.clone(),
                    import: import.clone(),
                });
            }
        }

        // Stage all additions before touching the registry, so a failure
        // partway leaves nothing registered.
        let mut staged_paths: Vec<(String, NodeSchema)> = Vec::new();
        for node in &module.nodes {
            Self::check_node(node)?;
            if inner.paths.contains_key(&node.path)
                || staged_paths.iter().any(|(p, _)| *p == node.path)
            {
                return Err(SchemaError::DuplicatePath {
                    path: node.path.clone(),
                    module: module.name.clone(),
                });
            }
            staged_paths.push((node.path.clone(), node.clone()));
        }
        for node in &module.nodes {
            if node.kind == SchemaNodeKind::List {
                for keyed in &node.keys {
                    let key_path = format!("{}/{keyed}", node.path);
                    let present = staged_paths.iter().any(|(p, _)| *p == key_path)
                        || inner.paths.contains_key(&key_path);
                    if !present {
                        return Err(SchemaError::invalid_node(
                            &node.path,
                            format!("list key {keyed} has no leaf schema"),
                        ));
                    }
                }
            }
        }

        for (path, node) in staged_paths {
            let parent = parent_path(&path);
            inner.children.entry(parent).or_default().push(path.clone());
            inner.paths.insert(path, node);
        }
        inner.rpcs.extend(module.rpcs.iter().cloned());
        inner.sources.insert(key.clone(), source.to_string());
        inner.modules.insert(key, module.clone());

        info!(
            module = %module.name,
            revision = %module.revision,
            nodes = module.nodes.len(),
            "loaded schema module"
        );
        Ok(module)
    }

    fn check_node(node: &NodeSchema) -> SchemaResult<()> {
        match node.kind {
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                if node.leaf_type.is_none() {
                    return Err(SchemaError::invalid_node(&node.path, "leaf without a type"));
                }
            }
            SchemaNodeKind::List => {
                if node.keys.is_empty() {
                    return Err(SchemaError::invalid_node(&node.path, "list without keys"));
                }
            }
            _ => {}
        }
        if !node.path.starts_with('/') || node.path.ends_with('/') {
            return Err(SchemaError::invalid_node(&node.path, "malformed schema path"));
        }
        Ok(())
    }

    /// Resolves an absolute, predicate-free schema path.
    #[must_use]
    pub fn resolve_path(&self, schema_path: &str) -> Option<NodeSchema> {
        self.inner.read().paths.get(schema_path).cloned()
    }

    /// Direct child schemas of a path (`"/"` for the top level).
    #[must_use]
    pub fn children_of(&self, schema_path: &str) -> Vec<NodeSchema> {
        let inner = self.inner.read();
        inner
            .children
            .get(schema_path)
            .map(|paths| {
                paths
                    .iter()
                    .filter_map(|p| inner.paths.get(p).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All loaded modules, ordered by name then revision.
    #[must_use]
    pub fn list_modules(&self) -> Vec<ModuleData> {
        self.inner.read().modules.values().cloned().collect()
    }

    /// The stored source text for a module, latest revision if unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ModuleNotFound`] if no matching module is
    /// loaded.
    pub fn module_source(&self, name: &str, revision: Option<&str>) -> SchemaResult<String> {
        let inner = self.inner.read();
        let found = inner
            .sources
            .iter()
            .filter(|((n, r), _)| n == name && revision.map_or(true, |want| want == r))
            .next_back();
        match found {
            Some((_, source)) => Ok(source.clone()),
            None => Err(SchemaError::ModuleNotFound {
                name: name.to_string(),
                revision: revision.map(str::to_string),
            }),
        }
    }

    /// True if the path names an RPC/action head.
    #[must_use]
    pub fn is_rpc(&self, schema_path: &str) -> bool {
        self.inner.read().rpcs.iter().any(|p| p == schema_path)
    }

    /// Attaches a semantic constraint check to a schema path.
    pub fn register_constraint(&self, schema_path: impl Into<String>, check: Arc<dyn ConstraintCheck>) {
        self.constraints
            .write()
            .entry(schema_path.into())
            .or_default()
            .push(check);
    }

    /// The constraint checks attached to a schema path.
    #[must_use]
    pub fn constraints_for(&self, schema_path: &str) -> Vec<Arc<dyn ConstraintCheck>> {
        self.constraints
            .read()
            .get(schema_path)
            .cloned()
            .unwrap_or_default()
    }

    /// Registers the handler body for an RPC/action path.
    pub fn register_rpc_handler(&self, schema_path: impl Into<String>, handler: Arc<dyn RpcHandler>) {
        self.handlers.write().insert(schema_path.into(), handler);
    }

    /// Looks up the handler for an RPC/action path.
    #[must_use]
    pub fn rpc_handler(&self, schema_path: &str) -> Option<Arc<dyn RpcHandler>> {
        self.handlers.read().get(schema_path).cloned()
    }
}

impl KeyLookup for SchemaRegistry {
    fn list_keys(&self, schema_path: &str) -> Option<Vec<String>> {
        let node = self.resolve_path(schema_path)?;
        (node.kind == SchemaNodeKind::List).then_some(node.keys)
    }
}

fn parent_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}
