//! The transaction engine: running configuration ownership and the
//! two-phase commit state machine.

use crate::config::{EngineConfig, PendingCommitPolicy};
use crate::error::{EngineError, EngineResult};
use crate::timer::TimerHandle;
use crate::view::{filter_tree, DataType};
use parking_lot::{Mutex, RwLock};
use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};
use yangate_rollback::{
    CommitSummary, FileStore, LogStore, MemStore, OperationKind, RollbackLog,
};
use yangate_schema::{fill_defaults, normalize, validate, SchemaRegistry};
use yangate_tree::{
    apply_change_patch, merge, ChangeOp, DataNode, DataTree, Encoding, Path,
};

/// A commit request's payload: the edit to apply to the running tree.
#[derive(Debug, Clone)]
pub enum CommitPayload {
    /// Merge a patch subtree into the running configuration.
    Merge(DataTree),
    /// Supersede the running configuration wholesale.
    Replace(DataTree),
    /// Apply an ordered change patch.
    Change(Vec<ChangeOp>),
}

impl CommitPayload {
    fn operation(&self) -> OperationKind {
        match self {
            Self::Merge(_) => OperationKind::Merge,
            Self::Replace(_) => OperationKind::Replace,
            Self::Change(_) => OperationKind::Change,
        }
    }
}

/// A commit request.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    /// The edit to apply.
    pub payload: CommitPayload,
    /// Free-text audit comment.
    pub comment: String,
    /// If non-zero, the commit must be confirmed within this duration or
    /// it is automatically reverted.
    pub confirmed_timeout: Duration,
}

impl CommitRequest {
    /// A merge commit.
    #[must_use]
    pub fn merge(tree: DataTree) -> Self {
        Self::new(CommitPayload::Merge(tree))
    }

    /// A replace commit.
    #[must_use]
    pub fn replace(tree: DataTree) -> Self {
        Self::new(CommitPayload::Replace(tree))
    }

    /// A change-patch commit.
    #[must_use]
    pub fn change(ops: Vec<ChangeOp>) -> Self {
        Self::new(CommitPayload::Change(ops))
    }

    fn new(payload: CommitPayload) -> Self {
        Self {
            payload,
            comment: String::new(),
            confirmed_timeout: Duration::ZERO,
        }
    }

    /// Sets the audit comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Requests a confirmation window of the given duration.
    #[must_use]
    pub fn confirmed_timeout(mut self, timeout: Duration) -> Self {
        self.confirmed_timeout = timeout;
        self
    }
}

/// The result of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The allocated transaction ID.
    pub txid: u64,
    /// Commit time, nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
    /// True if the commit is awaiting confirmation.
    pub awaiting_confirmation: bool,
}

/// A committed transaction read back from the rollback log.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Transaction ID.
    pub txid: u64,
    /// Commit time, nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
    /// The kind of edit that produced it.
    pub operation: OperationKind,
    /// Audit comment.
    pub comment: String,
    /// The full configuration as it stood immediately after this commit.
    pub tree: DataTree,
}

/// An open confirmation window, as visible to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommit {
    /// The unconfirmed transaction.
    pub txid: u64,
    /// Expiry deadline, nanoseconds since the Unix epoch.
    pub deadline_ns: u64,
    /// Transaction whose configuration is the revert target (0 = empty).
    pub revert_txid: u64,
}

/// In-flight confirmation window state, gate-protected.
struct Window {
    txid: u64,
    deadline: Instant,
    deadline_ns: u64,
    revert_txid: u64,
    /// The configuration to restore on expiry.
    prior: Arc<DataTree>,
    /// Guards against a stale timer fire racing a confirm or new commit.
    generation: u64,
}

/// State protected by the commit mutex. Exactly one commit (or timer
/// reversion) manipulates this at a time.
struct Gate {
    /// ID of the commit whose tree is currently running (0 = none).
    current_txid: u64,
    pending: Option<Window>,
    next_generation: u64,
}

pub(crate) struct Shared {
    registry: Arc<SchemaRegistry>,
    log: RollbackLog,
    /// The running configuration. Readers clone the `Arc` under a short
    /// read lock; the swap in commit phase 2 is the only write.
    running: RwLock<Arc<DataTree>>,
    gate: Mutex<Gate>,
    config: EngineConfig,
}

impl Shared {
    fn snapshot(&self) -> Arc<DataTree> {
        Arc::clone(&self.running.read())
    }

    /// Timer-side reversion of an expired confirmation window.
    ///
    /// Stale generations (the window was confirmed or replaced after the
    /// timer message was sent) are dropped silently.
    pub(crate) fn revert_expired(&self, generation: u64) -> EngineResult<()> {
        let mut gate = self.gate.lock();
        let Some(window) = gate.pending.take() else {
            return Ok(());
        };
        if window.generation != generation {
            gate.pending = Some(window);
            return Ok(());
        }

        let timestamp_ns = unix_now_ns();
        let comment = format!("reverted unconfirmed transaction {}", window.txid);
        let tree_bytes = window.prior.serialize(Encoding::Binary);
        let txid = match self
            .log
            .append_commit(timestamp_ns, OperationKind::Replace, &comment, tree_bytes)
        {
            Ok(txid) => txid,
            Err(err) => {
                // Keep the window so the timer can retry.
                gate.pending = Some(window);
                return Err(err.into());
            }
        };
        if let Err(err) = self.log.append_resolve(window.txid) {
            warn!(%err, "could not record window resolution after reversion");
        }

        *self.running.write() = Arc::clone(&window.prior);
        gate.current_txid = txid;
        info!(
            expired = window.txid,
            reversion = txid,
            "confirmation window expired, configuration reverted"
        );
        Ok(())
    }
}

/// The northbound configuration engine.
///
/// Owns the running configuration and the rollback log; everything else
/// reads snapshots. All mutation flows through [`ConfigEngine::commit`].
pub struct ConfigEngine {
    shared: Arc<Shared>,
    timer: TimerHandle,
}

impl ConfigEngine {
    /// Opens an engine with a file-backed rollback log at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the log is locked by another process, is corrupt, or
    /// cannot be read.
    pub fn open(
        path: &FsPath,
        config: EngineConfig,
        registry: Arc<SchemaRegistry>,
    ) -> EngineResult<Self> {
        let store = FileStore::open(path).map_err(EngineError::from)?;
        Self::open_with_store(Box::new(store), config, registry)
    }

    /// Opens an engine with an in-memory log, for tests and ephemeral use.
    ///
    /// # Errors
    ///
    /// Fails only on registry/configuration problems.
    pub fn open_in_memory(
        config: EngineConfig,
        registry: Arc<SchemaRegistry>,
    ) -> EngineResult<Self> {
        Self::open_with_store(Box::new(MemStore::new()), config, registry)
    }

    /// Opens an engine over a pre-configured log store.
    ///
    /// Recovery: the running configuration is rebuilt from the last commit
    /// record; an unresolved confirmation window whose deadline passed
    /// during downtime is reverted here, recorded as its own transaction,
    /// before any request is served. A still-open window is re-armed for
    /// its remaining time.
    ///
    /// # Errors
    ///
    /// Fails if the log is corrupt or recovery appends cannot be written.
    pub fn open_with_store(
        store: Box<dyn LogStore>,
        config: EngineConfig,
        registry: Arc<SchemaRegistry>,
    ) -> EngineResult<Self> {
        let log = RollbackLog::open(store)?;

        let mut current_txid = 0;
        let mut running = DataTree::empty();
        if let Some(latest) = log.latest() {
            running = decode_stored_tree(&log.get(latest.txid)?.tree)?;
            current_txid = latest.txid;
        }

        let mut restored_window = None;
        if let Some(marker) = log.pending() {
            let prior = if marker.revert_txid == 0 {
                DataTree::empty()
            } else {
                decode_stored_tree(&log.get(marker.revert_txid)?.tree)?
            };
            let now = unix_now_ns();
            if marker.deadline_ns <= now {
                let comment = format!("reverted unconfirmed transaction {}", marker.txid);
                let tree_bytes = prior.serialize(Encoding::Binary);
                let txid =
                    log.append_commit(now, OperationKind::Replace, &comment, tree_bytes)?;
                if let Err(err) = log.append_resolve(marker.txid) {
                    warn!(%err, "could not record window resolution after restart reversion");
                }
                info!(
                    expired = marker.txid,
                    reversion = txid,
                    "confirmation window expired during downtime, reverted at startup"
                );
                running = prior;
                current_txid = txid;
            } else {
                let remaining = Duration::from_nanos(marker.deadline_ns - now);
                restored_window = Some((marker, Arc::new(prior), remaining));
            }
        }

        let retry_backoff = config.revert_retry_backoff;
        let shared = Arc::new(Shared {
            registry,
            log,
            running: RwLock::new(Arc::new(running)),
            gate: Mutex::new(Gate {
                current_txid,
                pending: None,
                next_generation: 1,
            }),
            config,
        });

        let timer = TimerHandle::spawn(Arc::downgrade(&shared), retry_backoff);

        if let Some((marker, prior, remaining)) = restored_window {
            let deadline = Instant::now() + remaining;
            let mut gate = shared.gate.lock();
            gate.pending = Some(Window {
                txid: marker.txid,
                deadline,
                deadline_ns: marker.deadline_ns,
                revert_txid: marker.revert_txid,
                prior,
                generation: 0,
            });
            drop(gate);
            timer.arm(0, deadline);
            info!(
                txid = marker.txid,
                remaining_ms = remaining.as_millis() as u64,
                "re-armed confirmation window after restart"
            );
        }

        debug!(
            commits = shared.log.commit_count(),
            current_txid, "engine opened"
        );
        Ok(Self { shared, timer })
    }

    /// A snapshot of the running configuration.
    #[must_use]
    pub fn running(&self) -> Arc<DataTree> {
        self.shared.snapshot()
    }

    /// The schema registry this engine validates against.
    #[must_use]
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.shared.registry
    }

    /// Commits a configuration change.
    ///
    /// Phase 1 computes and validates the candidate against the running
    /// configuration as of entry into the commit critical section; any
    /// failure there leaves no visible change and consumes no transaction
    /// ID. Phase 2 appends the durable record, then swaps the running
    /// tree; readers observe either the old or the new configuration,
    /// never a mixture.
    ///
    /// # Errors
    ///
    /// `Validation`/`Patch` for rejected candidates, `Resource` when the
    /// record cannot be made durable, `PendingConfirmation` when a window
    /// is open under [`PendingCommitPolicy::Reject`].
    pub fn commit(&self, request: CommitRequest) -> EngineResult<CommitOutcome> {
        let registry = &self.shared.registry;
        let mut gate = self.shared.gate.lock();

        if let Some(window) = gate.pending.as_ref() {
            if self.shared.config.pending_policy == PendingCommitPolicy::Reject
                && !request.confirmed_timeout.is_zero()
            {
                return Err(EngineError::PendingConfirmation { txid: window.txid });
            }
        }

        // Phase 1: candidate + validation, no visible change on failure.
        let base = self.shared.snapshot();
        let operation = request.payload.operation();
        let candidate = match &request.payload {
            CommitPayload::Merge(patch) => {
                let patch = normalize(patch, registry)?;
                merge(&base, &patch, registry.as_ref())
            }
            CommitPayload::Replace(new) => normalize(new, registry)?,
            CommitPayload::Change(ops) => {
                let changed = apply_change_patch(&base, ops)?;
                normalize(&changed, registry)?
            }
        };
        validate(&candidate, registry)?;

        // Phase 2: durable record, then the swap.
        let timestamp_ns = unix_now_ns();
        let tree_bytes = candidate.serialize(Encoding::Binary);
        let txid =
            self.shared
                .log
                .append_commit(timestamp_ns, operation, &request.comment, tree_bytes)?;
        let candidate = Arc::new(candidate);
        *self.shared.running.write() = Arc::clone(&candidate);

        let mut awaiting_confirmation = false;
        if request.confirmed_timeout.is_zero() {
            if let Some(window) = gate.pending.take() {
                if let Err(err) = self.shared.log.append_resolve(window.txid) {
                    warn!(%err, "could not record window resolution");
                }
                self.timer.cancel();
                info!(confirmed = window.txid, by = txid, "pending commit confirmed");
            }
        } else {
            // A replacing commit keeps the original revert target: if the
            // chain goes unconfirmed, everything since the first window
            // opened is undone.
            let (revert_txid, prior) = match gate.pending.take() {
                Some(window) => {
                    if let Err(err) = self.shared.log.append_resolve(window.txid) {
                        warn!(%err, "could not record window resolution");
                    }
                    info!(replaced = window.txid, by = txid, "confirmation window replaced");
                    (window.revert_txid, window.prior)
                }
                None => (gate.current_txid, base),
            };
            let deadline = Instant::now() + request.confirmed_timeout;
            let deadline_ns = timestamp_ns
                .saturating_add(u64::try_from(request.confirmed_timeout.as_nanos()).unwrap_or(u64::MAX));
            if let Err(err) = self.shared.log.append_pending(txid, deadline_ns, revert_txid) {
                // The window still exists in-process; only restart recovery
                // would miss it.
                warn!(%err, txid, "could not record confirmation window marker");
            }
            let generation = gate.next_generation;
            gate.next_generation += 1;
            gate.pending = Some(Window {
                txid,
                deadline,
                deadline_ns,
                revert_txid,
                prior,
                generation,
            });
            self.timer.arm(generation, deadline);
            awaiting_confirmation = true;
        }

        gate.current_txid = txid;
        info!(txid, ?operation, awaiting_confirmation, "commit applied");
        Ok(CommitOutcome {
            txid,
            timestamp_ns,
            awaiting_confirmation,
        })
    }

    /// Confirms the open confirmation window without committing new state.
    ///
    /// # Errors
    ///
    /// `Request` if no commit is awaiting confirmation; `Resource` if the
    /// resolution cannot be recorded (the window stays open).
    pub fn confirm(&self) -> EngineResult<()> {
        let mut gate = self.shared.gate.lock();
        let Some(window) = gate.pending.take() else {
            return Err(EngineError::request("no commit is awaiting confirmation"));
        };
        if let Err(err) = self.shared.log.append_resolve(window.txid) {
            gate.pending = Some(window);
            return Err(err.into());
        }
        info!(confirmed = window.txid, "pending commit confirmed");
        self.timer.cancel();
        Ok(())
    }

    /// The open confirmation window, if any.
    #[must_use]
    pub fn pending(&self) -> Option<PendingCommit> {
        let gate = self.shared.gate.lock();
        gate.pending.as_ref().map(|w| PendingCommit {
            txid: w.txid,
            deadline_ns: w.deadline_ns,
            revert_txid: w.revert_txid,
        })
    }

    /// Validates a candidate tree without committing it.
    ///
    /// Runs against the current snapshot with no mutex held, so it can
    /// proceed in parallel with reads and with an in-flight commit.
    ///
    /// # Errors
    ///
    /// `Validation` describing the first violated constraint.
    pub fn validate(&self, candidate: &DataTree) -> EngineResult<()> {
        let normalized = normalize(candidate, &self.shared.registry)?;
        validate(&normalized, &self.shared.registry)?;
        Ok(())
    }

    /// Reads (a subtree of) the running configuration.
    ///
    /// Returns the snapshot timestamp in nanoseconds since the Unix epoch
    /// together with the data. An unparseable path is an error; a path
    /// that resolves to nothing yields an empty tree.
    ///
    /// # Errors
    ///
    /// `Request` on a malformed path.
    pub fn get(
        &self,
        path: Option<&str>,
        data_type: DataType,
        with_defaults: bool,
    ) -> EngineResult<(u64, DataTree)> {
        let parsed_path = path
            .map(|text| {
                text.parse::<Path>()
                    .map_err(|err| EngineError::request(format!("bad path {text:?}: {err}")))
            })
            .transpose()?;

        let snapshot = self.shared.snapshot();
        let timestamp_ns = unix_now_ns();

        // Defaults and the config/state filter need schema-aligned paths,
        // so they run on the full tree before the subtree is taken.
        let mut tree = (*snapshot).clone();
        if with_defaults {
            tree = fill_defaults(&tree, &self.shared.registry);
        }
        tree = filter_tree(&tree, data_type, &self.shared.registry);
        if let Some(path) = parsed_path {
            tree = tree.subtree(&path);
        }
        Ok((timestamp_ns, tree))
    }

    /// Executes the single RPC/action invocation contained in `payload`.
    ///
    /// The invocation is validated against its registered signature, the
    /// handler runs against a read-only snapshot of the running
    /// configuration, and the handler's output nodes are grafted under the
    /// invocation node in the returned tree. No transaction ID is ever
    /// allocated and the running configuration is never touched.
    ///
    /// # Errors
    ///
    /// `Request` when the payload does not hold exactly one known
    /// invocation, `Validation` on bad input parameters, `Rpc` when the
    /// handler fails.
    pub fn execute(&self, payload: &DataTree) -> EngineResult<DataTree> {
        let registry = &self.shared.registry;
        let mut tree = normalize(payload, registry)?;
        validate(&tree, registry)?;

        let mut invocations = Vec::new();
        locate_invocations(registry, &tree.roots, "", &mut Vec::new(), &mut invocations);
        if invocations.len() != 1 {
            return Err(EngineError::request(format!(
                "execute payload must contain exactly one rpc or action invocation, found {}",
                invocations.len()
            )));
        }
        let (trail, schema_path) = invocations.remove(0);

        let handler = registry.rpc_handler(&schema_path).ok_or_else(|| {
            EngineError::request(format!("no handler registered for {schema_path}"))
        })?;

        let snapshot = self.shared.snapshot();
        let outputs = {
            let node = node_at(&tree.roots, &trail);
            handler
                .invoke(node, &snapshot)
                .map_err(|err| EngineError::Rpc {
                    message: err.message,
                })?
        };
        node_at_mut(&mut tree.roots, &trail).children.extend(outputs);
        debug!(rpc = %schema_path, "rpc executed");
        Ok(tree)
    }

    /// Summaries of all committed transactions, oldest first.
    #[must_use]
    pub fn list_transactions(&self) -> Vec<CommitSummary> {
        self.shared.log.list()
    }

    /// The full transaction record for `txid`, including the configuration
    /// exactly as it stood after that commit.
    ///
    /// # Errors
    ///
    /// `TransactionNotFound` for IDs absent from the log.
    pub fn get_transaction(&self, txid: u64) -> EngineResult<Transaction> {
        let record = self.shared.log.get(txid)?;
        Ok(Transaction {
            txid: record.txid,
            timestamp_ns: record.timestamp_ns,
            operation: record.operation,
            comment: record.comment,
            tree: decode_stored_tree(&record.tree)?,
        })
    }
}

impl Drop for ConfigEngine {
    fn drop(&mut self) {
        self.timer.shutdown();
    }
}

impl std::fmt::Debug for ConfigEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigEngine")
            .field("log", &self.shared.log)
            .finish_non_exhaustive()
    }
}

/// Current time in nanoseconds since the Unix epoch.
pub fn unix_now_ns() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
}

fn decode_stored_tree(bytes: &[u8]) -> EngineResult<DataTree> {
    DataTree::parse(bytes, Encoding::Binary)
        .map_err(|err| EngineError::resource(format!("corrupt stored configuration: {err}")))
}

/// Collects `(index trail, schema path)` for every node registered as an
/// RPC/action head.
fn locate_invocations(
    registry: &SchemaRegistry,
    nodes: &[DataNode],
    prefix: &str,
    trail: &mut Vec<usize>,
    found: &mut Vec<(Vec<usize>, String)>,
) {
    for (i, node) in nodes.iter().enumerate() {
        let path = format!("{prefix}/{}", node.name);
        trail.push(i);
        if registry.is_rpc(&path) {
            found.push((trail.clone(), path.clone()));
        } else {
            locate_invocations(registry, &node.children, &path, trail, found);
        }
        trail.pop();
    }
}

fn node_at<'a>(roots: &'a [DataNode], trail: &[usize]) -> &'a DataNode {
    let mut node = &roots[trail[0]];
    for &i in &trail[1..] {
        node = &node.children[i];
    }
    node
}

fn node_at_mut<'a>(roots: &'a mut [DataNode], trail: &[usize]) -> &'a mut DataNode {
    let mut node = &mut roots[trail[0]];
    for &i in &trail[1..] {
        node = &mut node.children[i];
    }
    node
}
