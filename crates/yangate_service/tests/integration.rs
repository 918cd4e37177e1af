//! End-to-end tests of the northbound surface over an in-memory engine.

use std::sync::Arc;
use yangate_service::{
    CommitRequest, DataType, Encoding, ExecuteRequest, GetRequest, GetSchemaRequest,
    GetTransactionRequest, NorthboundServer, Operation, PayloadBody, StatusCode, TreePayload,
    ValidateRequest,
};
use yangate_testkit::prelude::*;

fn server() -> NorthboundServer {
    NorthboundServer::new(Arc::new(TestEngine::memory().engine))
}

fn get_request(encoding: Encoding) -> GetRequest {
    GetRequest {
        data_type: DataType::All,
        encoding,
        with_defaults: false,
        path: None,
    }
}

#[test]
fn capabilities_reports_modules_and_encodings() {
    let server = server();
    let caps = server.handle_capabilities();
    assert!(!caps.version.is_empty());
    assert_eq!(caps.modules.len(), 1);
    assert_eq!(caps.modules[0].name, "interfaces");
    assert_eq!(caps.modules[0].features, vec!["vlan"]);
    assert_eq!(caps.encodings.len(), 3);
}

#[test]
fn get_schema_serves_module_source() {
    let server = server();
    let response = server
        .handle_get_schema(GetSchemaRequest {
            module: "interfaces".to_string(),
            revision: None,
        })
        .unwrap();
    assert!(response.text.contains("\"name\": \"interfaces\""));

    let err = server
        .handle_get_schema(GetSchemaRequest {
            module: "ghost".to_string(),
            revision: None,
        })
        .unwrap_err();
    assert_eq!(err.code, StatusCode::NotFound);
}

#[test]
fn commit_then_get_roundtrip_json() {
    let server = server();
    let response = server
        .handle_commit(CommitRequest {
            operation: Operation::Merge,
            data: TreePayload::json(INTERFACES_JSON),
            comment: "bring up eth0".to_string(),
            confirmed_timeout: 0,
        })
        .unwrap();
    assert_eq!(response.txid, 1);

    let got = server.handle_get(get_request(Encoding::Json)).unwrap();
    let tree = got.data.decode().unwrap();
    assert!(tree.equivalent(&interfaces_tree()));
    assert!(got.timestamp_ns > 0);
}

#[test]
fn commit_accepts_xml_and_get_reencodes_binary() {
    let server = server();
    server
        .handle_commit(CommitRequest {
            operation: Operation::Merge,
            data: TreePayload::xml(INTERFACES_XML),
            comment: String::new(),
            confirmed_timeout: 0,
        })
        .unwrap();

    let got = server.handle_get(get_request(Encoding::Binary)).unwrap();
    assert!(matches!(got.data.body, PayloadBody::Bytes(_)));
    // Schema coercion makes the XML-sourced tree canonical.
    assert!(got.data.decode().unwrap().equivalent(&interfaces_tree()));
}

#[test]
fn invalid_commit_maps_to_invalid_argument() {
    let server = server();
    let err = server
        .handle_commit(CommitRequest {
            operation: Operation::Merge,
            data: TreePayload::json(
                r#"{"interfaces": {"interface": [{"name": "eth0", "enabled": "sideways"}]}}"#,
            ),
            comment: String::new(),
            confirmed_timeout: 0,
        })
        .unwrap_err();
    assert_eq!(err.code, StatusCode::InvalidArgument);
    assert_eq!(server.handle_list_transactions().count(), 0);
}

#[test]
fn mismatched_payload_variant_is_rejected() {
    let server = server();
    let err = server
        .handle_validate(ValidateRequest {
            data: TreePayload {
                encoding: Encoding::Json,
                body: PayloadBody::Bytes(vec![0x7B]),
            },
        })
        .unwrap_err();
    assert_eq!(err.code, StatusCode::InvalidArgument);
}

#[test]
fn change_commit_over_the_wire() {
    let server = server();
    server
        .handle_commit(CommitRequest {
            operation: Operation::Merge,
            data: TreePayload::json(INTERFACES_JSON),
            comment: String::new(),
            confirmed_timeout: 0,
        })
        .unwrap();

    server
        .handle_commit(CommitRequest {
            operation: Operation::Change,
            data: TreePayload::json(
                r#"{"changes": {"change": [
                    { "op": "replace",
                      "path": "/interfaces/interface[name=eth0]/enabled",
                      "value": { "enabled": false } }
                ]}}"#,
            ),
            comment: "disable eth0".to_string(),
            confirmed_timeout: 0,
        })
        .unwrap();

    let got = server.handle_get(get_request(Encoding::Json)).unwrap();
    let entry = &got.data.decode().unwrap().roots[0].children[0];
    assert_eq!(
        entry.leaf_value("enabled").map(|v| v.canonical_text()),
        Some("false".to_string())
    );
}

#[test]
fn validate_does_not_commit() {
    let server = server();
    server
        .handle_validate(ValidateRequest {
            data: TreePayload::json(INTERFACES_JSON),
        })
        .unwrap();
    assert_eq!(server.handle_list_transactions().count(), 0);
}

#[test]
fn list_and_get_transaction() {
    let server = server();
    for comment in ["first", "second"] {
        server
            .handle_commit(CommitRequest {
                operation: Operation::Merge,
                data: TreePayload::json(INTERFACES_JSON),
                comment: comment.to_string(),
                confirmed_timeout: 0,
            })
            .unwrap();
    }

    let records: Vec<_> = server.handle_list_transactions().collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].txid, 1);
    assert_eq!(records[0].comment, "first");
    assert_eq!(records[1].comment, "second");

    let response = server
        .handle_get_transaction(GetTransactionRequest {
            txid: 1,
            encoding: Encoding::Json,
        })
        .unwrap();
    assert!(response.data.decode().unwrap().equivalent(&interfaces_tree()));

    let err = server
        .handle_get_transaction(GetTransactionRequest {
            txid: 42,
            encoding: Encoding::Json,
        })
        .unwrap_err();
    assert_eq!(err.code, StatusCode::NotFound);
}

#[test]
fn get_config_filter_and_defaults() {
    let server = server();
    server
        .handle_commit(CommitRequest {
            operation: Operation::Merge,
            data: TreePayload::json(INTERFACES_JSON),
            comment: String::new(),
            confirmed_timeout: 0,
        })
        .unwrap();

    let got = server
        .handle_get(GetRequest {
            data_type: DataType::Config,
            encoding: Encoding::Json,
            with_defaults: true,
            path: Some("/interfaces/interface[name=eth0]".to_string()),
        })
        .unwrap();
    let tree = got.data.decode().unwrap();
    assert_eq!(tree.roots.len(), 1);
    assert_eq!(
        tree.roots[0].leaf_value("mtu").map(|v| v.canonical_text()),
        Some("1500".to_string())
    );
}

#[test]
fn execute_runs_registered_handler() {
    use yangate_schema::{RpcHandler, RpcHandlerError};
    use yangate_tree::{DataNode, DataTree};

    struct Restart;
    impl RpcHandler for Restart {
        fn invoke(
            &self,
            _invocation: &DataNode,
            _running: &DataTree,
        ) -> Result<Vec<DataNode>, RpcHandlerError> {
            Ok(vec![DataNode::container(
                "output",
                vec![DataNode::leaf("message", "ok")],
            )])
        }
    }

    let engine = TestEngine::memory();
    engine.registry().register_rpc_handler("/system-restart", Arc::new(Restart));
    let server = NorthboundServer::new(Arc::new(engine.engine));

    let response = server
        .handle_execute(ExecuteRequest {
            data: TreePayload::json(r#"{"system-restart": {"input": {"delay": 5}}}"#),
        })
        .unwrap();
    let tree = response.data.decode().unwrap();
    let message = tree.roots[0]
        .child("output")
        .and_then(|o| o.leaf_value("message"))
        .unwrap()
        .canonical_text();
    assert_eq!(message, "ok");
    assert_eq!(server.handle_list_transactions().count(), 0);
}
