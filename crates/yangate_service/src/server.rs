//! The northbound request handler.

use crate::changes::change_ops_from_tree;
use crate::error::ServiceResult;
use crate::messages::{
    CapabilitiesResponse, CommitRequest, CommitResponse, ExecuteRequest, ExecuteResponse,
    GetRequest, GetResponse, GetSchemaRequest, GetSchemaResponse, GetTransactionRequest,
    GetTransactionResponse, ModuleInfo, Operation, TransactionInfo, TreePayload, ValidateRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use yangate_engine::{CommitRequest as EngineCommit, ConfigEngine, EngineError};
use yangate_tree::Encoding;

/// The transport-agnostic northbound server.
///
/// Performs no business logic of its own: each handler decodes the
/// request, delegates to the engine, and re-encodes the response in the
/// client's requested encoding. A framing layer (HTTP, gRPC, local socket)
/// calls the `handle_*` methods directly.
///
/// # Example
///
/// ```ignore
/// let engine = Arc::new(ConfigEngine::open(path, config, registry)?);
/// let server = NorthboundServer::new(engine);
/// // framing layer:
/// let caps = server.handle_capabilities();
/// ```
pub struct NorthboundServer {
    engine: Arc<ConfigEngine>,
}

impl NorthboundServer {
    /// Creates a server over an open engine.
    #[must_use]
    pub fn new(engine: Arc<ConfigEngine>) -> Self {
        Self { engine }
    }

    /// The engine this server fronts.
    #[must_use]
    pub fn engine(&self) -> &Arc<ConfigEngine> {
        &self.engine
    }

    /// `Capabilities`: version, loaded modules, supported encodings.
    /// Always succeeds.
    #[must_use]
    pub fn handle_capabilities(&self) -> CapabilitiesResponse {
        let modules = self
            .engine
            .registry()
            .list_modules()
            .into_iter()
            .map(|m| ModuleInfo {
                name: m.name,
                organization: m.organization,
                revision: m.revision,
                features: m.features,
            })
            .collect();
        CapabilitiesResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            modules,
            encodings: vec![Encoding::Json, Encoding::Xml, Encoding::Binary],
        }
    }

    /// `GetSchema`: the stored source text of a module.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown module names or revisions.
    pub fn handle_get_schema(&self, request: GetSchemaRequest) -> ServiceResult<GetSchemaResponse> {
        let text = self
            .engine
            .registry()
            .module_source(&request.module, request.revision.as_deref())
            .map_err(EngineError::from)?;
        Ok(GetSchemaResponse { text })
    }

    /// `Get`: a snapshot read of (a subtree of) the running configuration.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` on a malformed path.
    pub fn handle_get(&self, request: GetRequest) -> ServiceResult<GetResponse> {
        let (timestamp_ns, tree) = self.engine.get(
            request.path.as_deref(),
            request.data_type,
            request.with_defaults,
        )?;
        Ok(GetResponse {
            timestamp_ns,
            data: TreePayload::from_tree(&tree, request.encoding)?,
        })
    }

    /// `Validate`: check a candidate without committing it.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` with the violated constraint.
    pub fn handle_validate(&self, request: ValidateRequest) -> ServiceResult<()> {
        let tree = request.data.decode()?;
        self.engine.validate(&tree)?;
        Ok(())
    }

    /// `Commit`: apply a configuration change.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` on parse/validation failure, `ResourceExhausted`
    /// when the record cannot be allocated or made durable.
    pub fn handle_commit(&self, request: CommitRequest) -> ServiceResult<CommitResponse> {
        let tree = request.data.decode()?;
        let engine_request = match request.operation {
            Operation::Merge => EngineCommit::merge(tree),
            Operation::Replace => EngineCommit::replace(tree),
            Operation::Change => EngineCommit::change(change_ops_from_tree(&tree)?),
        };
        let outcome = self
            .engine
            .commit(
                engine_request
                    .comment(request.comment)
                    .confirmed_timeout(Duration::from_secs(u64::from(request.confirmed_timeout) * 60)),
            )?;
        debug!(txid = outcome.txid, "commit handled");
        Ok(CommitResponse { txid: outcome.txid })
    }

    /// `Execute`: run the RPC/action invocation in the payload.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` on a malformed invocation, `Internal` when the
    /// handler body fails.
    pub fn handle_execute(&self, request: ExecuteRequest) -> ServiceResult<ExecuteResponse> {
        let encoding = request.data.encoding;
        let invocation = request.data.decode()?;
        let result = self.engine.execute(&invocation)?;
        Ok(ExecuteResponse {
            data: TreePayload::from_tree(&result, encoding)?,
        })
    }

    /// `ListTransactions`: all commits in log order, as a stream the
    /// framing layer can forward record by record.
    #[must_use]
    pub fn handle_list_transactions(&self) -> impl Iterator<Item = TransactionInfo> {
        self.engine
            .list_transactions()
            .into_iter()
            .map(|summary| TransactionInfo {
                txid: summary.txid,
                timestamp_ns: summary.timestamp_ns,
                comment: summary.comment,
            })
    }

    /// `GetTransaction`: the configuration exactly as committed by `txid`.
    ///
    /// # Errors
    ///
    /// `NotFound` for IDs absent from the log.
    pub fn handle_get_transaction(
        &self,
        request: GetTransactionRequest,
    ) -> ServiceResult<GetTransactionResponse> {
        let transaction = self.engine.get_transaction(request.txid)?;
        Ok(GetTransactionResponse {
            txid: transaction.txid,
            timestamp_ns: transaction.timestamp_ns,
            comment: transaction.comment,
            data: TreePayload::from_tree(&transaction.tree, request.encoding)?,
        })
    }
}

impl std::fmt::Debug for NorthboundServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NorthboundServer").finish_non_exhaustive()
    }
}
