//! # JSON-RPC 2.0 message envelope
//!
//! Requests, notifications and responses as they travel over the streamable HTTP
//! transport. Batches are not part of MCP and are rejected at decode time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::error::DecodeError;

/// JSON-RPC version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC version type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let version = String::deserialize(deserializer)?;
        if version == JSONRPC_VERSION {
            Ok(JsonRpcVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "Invalid JSON-RPC version: expected '{JSONRPC_VERSION}', got '{version}'"
            )))
        }
    }
}

/// Request identifier: a string or an integer, opaque to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric identifier
    Number(i64),
    /// String identifier
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self::String(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

/// JSON-RPC request message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
    /// Request method name
    pub method: String,
    /// Request parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request identifier
    pub id: RequestId,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request
    pub fn new(method: impl Into<String>, params: Option<Value>, id: impl Into<RequestId>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
            id: id.into(),
        }
    }

    /// Create a request with no parameters
    pub fn without_params(method: impl Into<String>, id: impl Into<RequestId>) -> Self {
        Self::new(method, None, id)
    }
}

/// JSON-RPC notification message (no response expected)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
    /// Notification method name
    pub method: String,
    /// Notification parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a new JSON-RPC notification
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
        }
    }

    /// Create a notification with no parameters
    pub fn without_params(method: impl Into<String>) -> Self {
        Self::new(method, None)
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Create a new JSON-RPC error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a parse error (-32700)
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error")
    }

    /// Create an invalid request error (-32600)
    pub fn invalid_request() -> Self {
        Self::new(-32600, "Invalid Request")
    }

    /// Create a method not found error (-32601)
    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, format!("Method not found: {method}"))
    }

    /// Create an invalid params error (-32602)
    pub fn invalid_params(details: &str) -> Self {
        Self::new(-32602, format!("Invalid params: {details}"))
    }

    /// Create an internal error (-32603)
    pub fn internal_error(details: &str) -> Self {
        Self::new(-32603, format!("Internal error: {details}"))
    }
}

/// JSON-RPC response payload - ensures mutual exclusion of result and error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponsePayload {
    /// Successful response with result
    Success {
        /// Response result
        result: Value,
    },
    /// Error response
    Error {
        /// Response error
        error: JsonRpcError,
    },
}

/// Response ID - `null` only for parse errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub Option<RequestId>);

/// JSON-RPC response message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
    /// Response payload (either result or error, never both)
    #[serde(flatten)]
    pub payload: JsonRpcResponsePayload,
    /// Request identifier
    pub id: ResponseId,
}

impl JsonRpcResponse {
    /// Create a successful response
    pub fn success(result: Value, id: impl Into<RequestId>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Success { result },
            id: ResponseId(Some(id.into())),
        }
    }

    /// Create an error response
    pub fn error_response(error: JsonRpcError, id: impl Into<RequestId>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Error { error },
            id: ResponseId(Some(id.into())),
        }
    }

    /// The request this response answers, `None` for parse errors
    pub fn request_id(&self) -> Option<&RequestId> {
        self.id.0.as_ref()
    }

    /// Replace the correlation id.
    ///
    /// Used when a server replays a response under a different id than the
    /// request it answers.
    #[must_use]
    pub fn with_id(mut self, id: RequestId) -> Self {
        self.id = ResponseId(Some(id));
        self
    }

    /// Get the result if this is a success response
    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            JsonRpcResponsePayload::Success { result } => Some(result),
            JsonRpcResponsePayload::Error { .. } => None,
        }
    }

    /// Get the error if this is an error response
    pub fn error(&self) -> Option<&JsonRpcError> {
        match &self.payload {
            JsonRpcResponsePayload::Success { .. } => None,
            JsonRpcResponsePayload::Error { error } => Some(error),
        }
    }
}

/// JSON-RPC message type (union of request, response, notification)
///
/// Variant order matters for untagged decoding: a request is tried before a
/// notification so that an `id` is never silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Request message
    Request(JsonRpcRequest),
    /// Response message
    Response(JsonRpcResponse),
    /// Notification message
    Notification(JsonRpcNotification),
}

impl JsonRpcMessage {
    /// Decode a single message from raw bytes.
    ///
    /// Malformed JSON and JSON that is not a request, notification or response
    /// both surface as [`DecodeError`].
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::new(bytes, e.to_string()))?;
        if value.is_array() {
            return Err(DecodeError::new(
                bytes,
                "JSON-RPC batches are not supported by MCP",
            ));
        }
        serde_json::from_value(value).map_err(|_| {
            DecodeError::new(
                bytes,
                "payload is not a JSON-RPC 2.0 request, notification or response",
            )
        })
    }

    /// Decode a single message from a string slice.
    pub fn decode_str(text: &str) -> Result<Self, DecodeError> {
        Self::decode(text.as_bytes())
    }

    /// Encode the message as compact JSON.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// The request id carried by a request or response.
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(request) => Some(&request.id),
            Self::Response(response) => response.request_id(),
            Self::Notification(_) => None,
        }
    }

    /// The method of a request or notification.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(request) => Some(&request.method),
            Self::Notification(notification) => Some(&notification.method),
            Self::Response(_) => None,
        }
    }

    /// Returns `true` for requests
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Returns `true` for notifications
    pub fn is_notification(&self) -> bool {
        matches!(self, Self::Notification(_))
    }

    /// Returns `true` for responses
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// Returns `true` if this is the `notifications/initialized` notification.
    pub fn is_initialized_notification(&self) -> bool {
        matches!(self, Self::Notification(n) if n.method == crate::INITIALIZED_NOTIFICATION)
    }
}

impl From<JsonRpcRequest> for JsonRpcMessage {
    fn from(request: JsonRpcRequest) -> Self {
        Self::Request(request)
    }
}

impl From<JsonRpcNotification> for JsonRpcMessage {
    fn from(notification: JsonRpcNotification) -> Self {
        Self::Notification(notification)
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_jsonrpc_version() {
        let json = serde_json::to_string(&JsonRpcVersion).unwrap();
        assert_eq!(json, "\"2.0\"");
        assert!(serde_json::from_str::<JsonRpcVersion>("\"1.0\"").is_err());
    }

    #[test]
    fn test_decode_request() {
        let msg =
            JsonRpcMessage::decode(br#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#).unwrap();
        assert!(msg.is_request());
        assert_eq!(msg.method(), Some("tools/list"));
        assert_eq!(msg.request_id(), Some(&RequestId::String("a".into())));
    }

    #[test]
    fn test_decode_notification() {
        let msg = JsonRpcMessage::decode(
            br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .unwrap();
        assert!(msg.is_notification());
        assert!(msg.is_initialized_notification());
        assert_eq!(msg.request_id(), None);
    }

    #[test]
    fn test_decode_success_response() {
        let msg = JsonRpcMessage::decode(br#"{"jsonrpc":"2.0","id":1,"result":{}}"#).unwrap();
        let JsonRpcMessage::Response(response) = msg else {
            panic!("expected response");
        };
        assert_eq!(response.request_id(), Some(&RequestId::Number(1)));
        assert_eq!(response.result(), Some(&json!({})));
    }

    #[test]
    fn test_decode_error_response() {
        let msg = JsonRpcMessage::decode(
            br#"{"jsonrpc":"2.0","id":7,"error":{"code":-32601,"message":"Method not found: x"}}"#,
        )
        .unwrap();
        let JsonRpcMessage::Response(response) = msg else {
            panic!("expected response");
        };
        assert_eq!(response.error().map(|e| e.code), Some(-32601));
        assert!(response.result().is_none());
    }

    #[test]
    fn test_decode_parse_error_response_with_null_id() {
        let msg = JsonRpcMessage::decode(
            br#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}}"#,
        )
        .unwrap();
        assert!(msg.is_response());
        assert_eq!(msg.request_id(), None);
    }

    #[test]
    fn test_valid_json_with_unknown_shape_is_decode_error() {
        let err = JsonRpcMessage::decode(br#"{"jsonrpc":"2.0","id":1}"#).unwrap_err();
        assert!(err.reason.contains("not a JSON-RPC 2.0"));
        assert_eq!(err.raw, r#"{"jsonrpc":"2.0","id":1}"#);

        assert!(JsonRpcMessage::decode(br#"{"hello":"world"}"#).is_err());
        assert!(JsonRpcMessage::decode(b"42").is_err());
    }

    #[test]
    fn test_wrong_version_is_decode_error() {
        assert!(JsonRpcMessage::decode(br#"{"jsonrpc":"1.0","id":1,"result":{}}"#).is_err());
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let err = JsonRpcMessage::decode(b"{not json").unwrap_err();
        assert_eq!(err.raw, "{not json");
    }

    #[test]
    fn test_batch_is_rejected() {
        let err = JsonRpcMessage::decode(br#"[{"jsonrpc":"2.0","method":"a"}]"#).unwrap_err();
        assert!(err.reason.contains("batches"));
    }

    #[test]
    fn test_encode_omits_missing_params() {
        let msg: JsonRpcMessage = JsonRpcRequest::without_params("ping", 3_i64).into();
        let encoded = String::from_utf8(msg.encode().unwrap()).unwrap();
        assert_eq!(encoded, r#"{"jsonrpc":"2.0","method":"ping","id":3}"#);
    }

    #[test]
    fn test_encoded_response_decodes_to_same_message() {
        let msg: JsonRpcMessage = JsonRpcResponse::success(json!({"tools": []}), "req-9").into();
        let decoded = JsonRpcMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_standard_error_codes() {
        assert_eq!(JsonRpcError::parse_error().code, -32700);
        assert_eq!(JsonRpcError::invalid_request().code, -32600);
        assert_eq!(JsonRpcError::method_not_found("x").code, -32601);
        assert_eq!(JsonRpcError::invalid_params("no cursor").code, -32602);
        assert_eq!(JsonRpcError::internal_error("oops").code, -32603);
        assert_eq!(
            JsonRpcError::method_not_found("tools/run").message,
            "Method not found: tools/run"
        );
    }

    #[test]
    fn test_error_response_encodes_and_decodes() {
        let response = JsonRpcResponse::error_response(JsonRpcError::invalid_params("id"), 4_i64);
        assert_eq!(response.request_id(), Some(&RequestId::Number(4)));
        assert!(response.result().is_none());

        let msg: JsonRpcMessage = response.into();
        let encoded = String::from_utf8(msg.encode().unwrap()).unwrap();
        assert!(encoded.contains(r#""code":-32602"#));
        assert!(!encoded.contains("result"));

        let decoded = JsonRpcMessage::decode(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_with_id_relabels_response() {
        let response = JsonRpcResponse::success(json!(null), 99_i64).with_id(RequestId::from("orig"));
        assert_eq!(response.request_id(), Some(&RequestId::String("orig".into())));
    }

    #[test]
    fn test_request_id_display() {
        assert_eq!(RequestId::Number(5).to_string(), "5");
        assert_eq!(RequestId::from("abc").to_string(), "abc");
    }
}
