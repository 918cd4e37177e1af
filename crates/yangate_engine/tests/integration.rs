//! Integration tests for the transaction engine: commit scenarios,
//! confirmed-commit reversion, and restart recovery.

use std::sync::Arc;
use std::time::{Duration, Instant};
use yangate_engine::{
    CommitRequest, ConfigEngine, DataType, EngineConfig, EngineError, PendingCommitPolicy,
};
use yangate_schema::{RpcHandler, RpcHandlerError, SchemaRegistry};
use yangate_tree::{ChangeOp, DataNode, DataTree, Path};

const MODULE: &str = r#"{
    "name": "interfaces",
    "organization": "Example Networks",
    "revision": "2026-01-15",
    "nodes": [
        { "path": "/interfaces", "kind": "container" },
        { "path": "/interfaces/interface", "kind": "list", "keys": ["name"] },
        { "path": "/interfaces/interface/name", "kind": "leaf",
          "type": { "base": "string" }, "mandatory": true },
        { "path": "/interfaces/interface/enabled", "kind": "leaf",
          "type": { "base": "boolean" } },
        { "path": "/interfaces/interface/mtu", "kind": "leaf",
          "type": { "base": "uint", "min": 68, "max": 9216 }, "default": "1500" },
        { "path": "/interfaces/interface/oper-status", "kind": "leaf",
          "type": { "base": "string" }, "config": false },
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

fn registry() -> Arc<SchemaRegistry> {
    let registry = SchemaRegistry::new();
    registry.load_module(MODULE).unwrap();
    Arc::new(registry)
}

fn open_engine() -> ConfigEngine {
    ConfigEngine::open_in_memory(EngineConfig::default(), registry()).unwrap()
}

fn iface(name: &str, enabled: bool) -> DataTree {
    DataTree::new(vec![DataNode::container(
        "interfaces",
        vec![DataNode::list_entry(
            "interface",
            vec![
                DataNode::leaf("name", name),
                DataNode::leaf("enabled", enabled),
            ],
        )],
    )])
}

/// Polls until `check` passes or five seconds elapse.
fn wait_for(mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("condition not reached within five seconds");
}

#[test]
fn merge_onto_empty_assigns_id_one() {
    let engine = open_engine();
    let outcome = engine
        .commit(CommitRequest::merge(iface("eth0", true)).comment("bring up eth0"))
        .unwrap();
    assert_eq!(outcome.txid, 1);
    assert!(!outcome.awaiting_confirmation);

    let (_, tree) = engine.get(None, DataType::Config, false).unwrap();
    assert!(tree.equivalent(&iface("eth0", true)));
}

#[test]
fn rejected_commit_leaves_no_trace() {
    let engine = open_engine();
    let bad = DataTree::new(vec![DataNode::container(
        "interfaces",
        vec![DataNode::list_entry(
            "interface",
            vec![
                DataNode::leaf("name", "eth0"),
                DataNode::leaf("enabled", "definitely"),
            ],
        )],
    )]);

    let err = engine.commit(CommitRequest::replace(bad)).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(engine.list_transactions().is_empty());
    assert!(engine.running().is_empty());

    // The failed commit consumed no transaction ID.
    let outcome = engine.commit(CommitRequest::merge(iface("eth0", true))).unwrap();
    assert_eq!(outcome.txid, 1);
}

#[test]
fn missing_mandatory_leaf_is_rejected() {
    let engine = open_engine();
    let nameless = DataTree::new(vec![DataNode::container(
        "interfaces",
        vec![DataNode::list_entry(
            "interface",
            vec![DataNode::leaf("enabled", true)],
        )],
    )]);
    assert!(matches!(
        engine.commit(CommitRequest::merge(nameless)),
        Err(EngineError::Validation(_))
    ));
}

#[test]
fn get_transaction_returns_committed_tree() {
    let engine = open_engine();
    engine.commit(CommitRequest::merge(iface("eth0", true))).unwrap();
    engine.commit(CommitRequest::merge(iface("eth1", false))).unwrap();

    let first = engine.get_transaction(1).unwrap();
    assert!(first.tree.equivalent(&iface("eth0", true)));

    let second = engine.get_transaction(2).unwrap();
    assert_eq!(second.tree.roots[0].children.len(), 2);

    assert!(matches!(
        engine.get_transaction(99),
        Err(EngineError::TransactionNotFound { txid: 99 })
    ));
}

#[test]
fn change_patch_commit() {
    let engine = open_engine();
    engine.commit(CommitRequest::merge(iface("eth0", true))).unwrap();

    let path: Path = "/interfaces/interface[name=eth0]/enabled".parse().unwrap();
    let ops = vec![ChangeOp::Replace {
        path,
        node: DataNode::leaf("enabled", false),
    }];
    engine.commit(CommitRequest::change(ops)).unwrap();

    let (_, tree) = engine.get(None, DataType::Config, false).unwrap();
    assert!(tree.equivalent(&iface("eth0", false)));
}

#[test]
fn failed_change_patch_reports_op_index() {
    let engine = open_engine();
    let path: Path = "/interfaces/interface[name=ghost]".parse().unwrap();
    let err = engine
        .commit(CommitRequest::change(vec![ChangeOp::Delete { path }]))
        .unwrap_err();
    match err {
        EngineError::Patch(patch) => assert_eq!(patch.index, 0),
        other => panic!("expected patch error, got {other:?}"),
    }
    assert!(engine.list_transactions().is_empty());
}

#[test]
fn get_with_defaults_fills_schema_defaults() {
    let engine = open_engine();
    engine.commit(CommitRequest::merge(iface("eth0", true))).unwrap();

    let (_, plain) = engine.get(None, DataType::Config, false).unwrap();
    assert!(plain.roots[0].children[0].leaf_value("mtu").is_none());

    let (_, filled) = engine.get(None, DataType::Config, true).unwrap();
    let mtu = filled.roots[0].children[0].leaf_value("mtu").unwrap();
    assert_eq!(mtu.canonical_text(), "1500");
}

#[test]
fn get_by_path_and_bad_path() {
    let engine = open_engine();
    engine.commit(CommitRequest::merge(iface("eth0", true))).unwrap();

    let (_, subtree) = engine
        .get(Some("/interfaces/interface[name=eth0]"), DataType::All, false)
        .unwrap();
    assert_eq!(subtree.roots.len(), 1);
    assert_eq!(subtree.roots[0].name, "interface");

    let (_, missing) = engine
        .get(Some("/interfaces/interface[name=ghost]"), DataType::All, false)
        .unwrap();
    assert!(missing.is_empty());

    assert!(matches!(
        engine.get(Some("/interfaces/interface[name"), DataType::All, false),
        Err(EngineError::Request { .. })
    ));
}

#[test]
fn expired_window_reverts_and_is_audited() {
    let engine = open_engine();
    engine.commit(CommitRequest::merge(iface("eth0", true))).unwrap();

    let outcome = engine
        .commit(
            CommitRequest::replace(iface("eth0", false))
                .confirmed_timeout(Duration::from_millis(100)),
        )
        .unwrap();
    assert!(outcome.awaiting_confirmation);
    assert!(engine.running().equivalent(&iface("eth0", false)));

    wait_for(|| engine.pending().is_none());
    assert!(engine.running().equivalent(&iface("eth0", true)));

    // Commit, unconfirmed commit, and the reversion itself.
    let transactions = engine.list_transactions();
    assert_eq!(transactions.len(), 3);
    assert!(transactions[2].comment.contains("reverted unconfirmed"));
}

#[test]
fn confirm_keeps_new_configuration() {
    let engine = open_engine();
    engine.commit(CommitRequest::merge(iface("eth0", true))).unwrap();
    engine
        .commit(
            CommitRequest::replace(iface("eth0", false))
                .confirmed_timeout(Duration::from_millis(150)),
        )
        .unwrap();

    engine.confirm().unwrap();
    assert!(engine.pending().is_none());

    std::thread::sleep(Duration::from_millis(400));
    assert!(engine.running().equivalent(&iface("eth0", false)));
    assert_eq!(engine.list_transactions().len(), 2);
}

#[test]
fn follow_up_commit_confirms_window() {
    let engine = open_engine();
    engine
        .commit(
            CommitRequest::merge(iface("eth0", true))
                .confirmed_timeout(Duration::from_millis(150)),
        )
        .unwrap();

    engine.commit(CommitRequest::merge(iface("eth1", false))).unwrap();
    assert!(engine.pending().is_none());

    std::thread::sleep(Duration::from_millis(400));
    assert_eq!(engine.running().roots[0].children.len(), 2);
}

#[test]
fn replacing_window_keeps_original_revert_target() {
    let engine = open_engine();
    engine.commit(CommitRequest::merge(iface("eth0", true))).unwrap();

    engine
        .commit(
            CommitRequest::replace(iface("eth0", false))
                .confirmed_timeout(Duration::from_millis(120)),
        )
        .unwrap();
    engine
        .commit(
            CommitRequest::merge(iface("eth1", true))
                .confirmed_timeout(Duration::from_millis(120)),
        )
        .unwrap();

    let pending = engine.pending().unwrap();
    assert_eq!(pending.revert_txid, 1);

    wait_for(|| engine.pending().is_none());
    // The whole unconfirmed chain is undone.
    assert!(engine.running().equivalent(&iface("eth0", true)));
}

#[test]
fn reject_policy_refuses_commits_while_pending() {
    let config = EngineConfig::new().pending_policy(PendingCommitPolicy::Reject);
    let engine = ConfigEngine::open_with_store(
        Box::new(yangate_rollback::MemStore::new()),
        config,
        registry(),
    )
    .unwrap();

    engine
        .commit(
            CommitRequest::merge(iface("eth0", true))
                .confirmed_timeout(Duration::from_secs(60)),
        )
        .unwrap();

    let err = engine
        .commit(
            CommitRequest::merge(iface("eth1", true))
                .confirmed_timeout(Duration::from_secs(60)),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::PendingConfirmation { txid: 1 }));

    // A plain commit is the confirmation path and stays allowed.
    engine.commit(CommitRequest::merge(iface("eth1", true))).unwrap();
    assert!(engine.pending().is_none());
}

#[test]
fn confirm_without_pending_is_an_error() {
    let engine = open_engine();
    assert!(matches!(
        engine.confirm(),
        Err(EngineError::Request { .. })
    ));
}

#[test]
fn execute_grafts_outputs_without_committing() {
    struct Restart;
    impl RpcHandler for Restart {
        fn invoke(
            &self,
            invocation: &DataNode,
            _running: &DataTree,
        ) -> Result<Vec<DataNode>, RpcHandlerError> {
            let delay = invocation
                .child("input")
                .and_then(|input| input.leaf_value("delay"))
                .map(|v| v.canonical_text())
                .unwrap_or_default();
            Ok(vec![DataNode::container(
                "output",
                vec![DataNode::leaf("message", format!("restarting in {delay}"))],
            )])
        }
    }

    let registry = registry();
    registry.register_rpc_handler("/system-restart", Arc::new(Restart));
    let engine = ConfigEngine::open_in_memory(EngineConfig::default(), registry).unwrap();

    let invocation = DataTree::new(vec![DataNode::container(
        "system-restart",
        vec![DataNode::container(
            "input",
            vec![DataNode::leaf("delay", 30_i64)],
        )],
    )]);
    let result = engine.execute(&invocation).unwrap();
    let message = result.roots[0]
        .child("output")
        .and_then(|o| o.leaf_value("message"))
        .unwrap();
    assert_eq!(message.canonical_text(), "restarting in 30");

    assert!(engine.list_transactions().is_empty());
    assert!(engine.running().is_empty());
}

#[test]
fn execute_rejects_unknown_invocation() {
    let engine = open_engine();
    let payload = iface("eth0", true);
    assert!(matches!(
        engine.execute(&payload),
        Err(EngineError::Request { .. })
    ));
}

#[test]
fn restart_recovers_running_configuration_and_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollback.log");

    {
        let engine =
            ConfigEngine::open(&path, EngineConfig::default(), registry()).unwrap();
        engine.commit(CommitRequest::merge(iface("eth0", true))).unwrap();
        engine.commit(CommitRequest::merge(iface("eth1", false))).unwrap();
    }

    let engine = ConfigEngine::open(&path, EngineConfig::default(), registry()).unwrap();
    assert_eq!(engine.running().roots[0].children.len(), 2);
    assert!(engine
        .get_transaction(1)
        .unwrap()
        .tree
        .equivalent(&iface("eth0", true)));

    let outcome = engine.commit(CommitRequest::merge(iface("eth2", true))).unwrap();
    assert_eq!(outcome.txid, 3);
}

#[test]
fn window_expiring_during_downtime_is_reverted_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollback.log");

    {
        let engine =
            ConfigEngine::open(&path, EngineConfig::default(), registry()).unwrap();
        engine.commit(CommitRequest::merge(iface("eth0", true))).unwrap();
        engine
            .commit(
                CommitRequest::replace(iface("eth0", false))
                    .confirmed_timeout(Duration::from_millis(300)),
            )
            .unwrap();
        // Engine shuts down with the window still open.
    }
    std::thread::sleep(Duration::from_millis(400));

    let engine = ConfigEngine::open(&path, EngineConfig::default(), registry()).unwrap();
    assert!(engine.pending().is_none());
    assert!(engine.running().equivalent(&iface("eth0", true)));

    let transactions = engine.list_transactions();
    assert_eq!(transactions.len(), 3);
    assert!(transactions[2].comment.contains("reverted unconfirmed"));
}

#[test]
fn open_window_is_rearmed_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollback.log");

    {
        let engine =
            ConfigEngine::open(&path, EngineConfig::default(), registry()).unwrap();
        engine.commit(CommitRequest::merge(iface("eth0", true))).unwrap();
        engine
            .commit(
                CommitRequest::replace(iface("eth0", false))
                    .confirmed_timeout(Duration::from_secs(60)),
            )
            .unwrap();
    }

    let engine = ConfigEngine::open(&path, EngineConfig::default(), registry()).unwrap();
    let pending = engine.pending().unwrap();
    assert_eq!(pending.txid, 2);
    assert_eq!(pending.revert_txid, 1);

    engine.confirm().unwrap();
    assert!(engine.running().equivalent(&iface("eth0", false)));
}

#[test]
fn concurrent_reads_never_observe_torn_state() {
    let engine = Arc::new(open_engine());
    engine.commit(CommitRequest::merge(iface("eth0", true))).unwrap();

    let reader = {
        let engine = Arc::clone(&engine);
        std::thread::spawn(move || {
            let old = iface("eth0", true);
            let new = iface("eth0", false);
            for _ in 0..500 {
                let snapshot = engine.running();
                assert!(snapshot.equivalent(&old) || snapshot.equivalent(&new));
            }
        })
    };

    for _ in 0..20 {
        engine.commit(CommitRequest::replace(iface("eth0", false))).unwrap();
        engine.commit(CommitRequest::replace(iface("eth0", true))).unwrap();
    }
    reader.join().unwrap();
}
