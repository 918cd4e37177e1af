//! # Yangate Service
//!
//! The transport-agnostic northbound surface: request/response message
//! types mirroring the wire contract, a status-code mapping, and a
//! [`NorthboundServer`] whose `handle_*` methods a framing layer (HTTP,
//! gRPC, local socket) calls directly. No business logic lives here; every
//! handler decodes, delegates to the engine, and re-encodes.

mod changes;
mod error;
mod messages;
mod server;

pub use changes::change_ops_from_tree;
pub use error::{ServiceError, ServiceResult, StatusCode};
pub use messages::{
    CapabilitiesResponse, CommitRequest, CommitResponse, ExecuteRequest, ExecuteResponse,
    GetRequest, GetResponse, GetSchemaRequest, GetSchemaResponse, GetTransactionRequest,
    GetTransactionResponse, ModuleInfo, Operation, PayloadBody, TransactionInfo, TreePayload,
    ValidateRequest,
};
pub use server::NorthboundServer;

// Request-side enums shared with the engine.
pub use yangate_engine::DataType;
pub use yangate_tree::Encoding;
