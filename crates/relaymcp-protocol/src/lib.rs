//! # RelayMCP Protocol
//!
//! JSON-RPC 2.0 message envelope used by the RelayMCP streamable HTTP transport.
//!
//! The transport only needs to tell requests, notifications and responses apart,
//! correlate responses to request identifiers, and survive payloads that are valid
//! JSON but not valid JSON-RPC. Method semantics (tools, resources, prompts) live in
//! the layer above and are carried here as opaque `serde_json::Value` params/results.
//!
//! ```rust
//! use relaymcp_protocol::{JsonRpcMessage, RequestId};
//!
//! let message = JsonRpcMessage::decode(br#"{"jsonrpc":"2.0","id":1,"result":{}}"#).unwrap();
//! assert!(message.is_response());
//! assert_eq!(message.request_id(), Some(&RequestId::Number(1)));
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
pub mod jsonrpc;

pub use error::DecodeError;
pub use jsonrpc::{
    JSONRPC_VERSION, JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, JsonRpcResponsePayload, JsonRpcVersion, RequestId, ResponseId,
};

/// Method name of the notification a client sends once initialization completes.
///
/// A `202 Accepted` reply to this notification is the cue to open the standalone
/// server-to-client event stream.
pub const INITIALIZED_NOTIFICATION: &str = "notifications/initialized";
