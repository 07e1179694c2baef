//! # RelayMCP HTTP Transport
//!
//! Client side of the MCP streamable HTTP transport.
//!
//! ## Features
//!
//! - **Single Endpoint Design**: every message is POSTed to one MCP endpoint
//! - **Three delivery modes**: immediate JSON, inline SSE in the POST response,
//!   and a standalone GET event stream
//! - **Session Management**: `mcp-session-id` learned from responses and echoed,
//!   DELETE on close
//! - **Last-Event-ID Resumability**: resume an interrupted stream with a token;
//!   replayed responses keep the original request id
//! - **Clean teardown**: stream tasks are cancelled and joined before `close()` returns
//! - **Size Limits**: configurable request/response size validation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relaymcp_http::{
//!     StreamableHttpClientConfig, StreamableHttpClientTransport, TransportEvent,
//!     TransportEventEmitter,
//! };
//! use relaymcp_protocol::{JsonRpcNotification, JsonRpcRequest};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (emitter, mut events) = TransportEventEmitter::new();
//!     let config = StreamableHttpClientConfig::new("http://localhost:8080/mcp");
//!     let transport = StreamableHttpClientTransport::new(config, Arc::new(emitter))?;
//!
//!     transport.start().await?;
//!     transport
//!         .send(JsonRpcRequest::new("initialize", Some(json!({})), 1_i64).into())
//!         .await?;
//!     if let Some(TransportEvent::Message(response)) = events.recv().await {
//!         println!("initialized: {response:?}");
//!     }
//!     transport
//!         .send(JsonRpcNotification::without_params("notifications/initialized").into())
//!         .await?;
//!
//!     transport.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## MCP Protocol Flow
//!
//! 1. Client POSTs `initialize`; the server answers with JSON or SSE and may assign a session id
//! 2. Client POSTs `notifications/initialized`; a `202 Accepted` opens the GET event stream
//! 3. Requests are POSTed; responses arrive on the POST body or the event stream
//! 4. An interrupted request is resumed with the last event id instead of re-POSTing
//! 5. Client terminates the session with DELETE

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod resumption;
mod stream;
pub mod traits;
mod transport;

pub use config::{LimitsConfig, StreamableHttpClientConfig, TimeoutConfig};
pub use error::{TransportError, TransportResult, validate_request_size, validate_response_size};
pub use events::{TransportEvent, TransportEventEmitter, TransportHandler};
pub use metrics::{AtomicMetrics, TransportMetrics};
pub use resumption::{ReplayContext, ResumptionCallback, ResumptionCursor};
pub use stream::StreamOrigin;
pub use traits::Transport;
pub use transport::{
    LAST_EVENT_ID, MCP_PROTOCOL_VERSION, MCP_SESSION_ID, SendOptions,
    StreamableHttpClientTransport, TransportState,
};
