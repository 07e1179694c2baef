//! Transport error types.

use thiserror::Error;

use relaymcp_protocol::DecodeError;

use crate::config::LimitsConfig;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Represents errors that can occur during transport operations.
///
/// The type is `Clone` so the same value can be handed to the
/// [`TransportHandler`](crate::TransportHandler) and returned to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP {code}: {body}")]
    HttpStatus {
        /// Response status code
        code: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// A success response carried a content type the transport cannot consume.
    #[error(
        "Unexpected content type: {}",
        .content_type.as_deref().unwrap_or("<none>")
    )]
    UnexpectedContentType {
        /// The `Content-Type` header, if any
        content_type: Option<String>,
    },

    /// A payload was not a valid JSON-RPC message.
    #[error("Failed to decode JSON-RPC message: {reason}")]
    Decode {
        /// The offending payload (truncated)
        raw: String,
        /// Why decoding failed
        reason: String,
    },

    /// The server pushed an `event: error` on an event stream.
    #[error("Event stream error: {0}")]
    EventStream(String),

    /// An event stream ended while the transport still expected data.
    #[error("Event stream closed")]
    StreamClosed,

    /// The transport has not been started, or has already been closed.
    #[error("Transport not started")]
    NotStarted,

    /// `start()` was called on a running transport.
    #[error("Transport already started")]
    AlreadyStarted,

    /// `start()` was called on a closed transport.
    #[error("Transport is closed")]
    Closed,

    /// Failed to establish a connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection was lost.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Failed to serialize a message.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// The transport was configured with invalid parameters.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Request size exceeds the configured maximum limit.
    #[error(
        "Request size ({size} bytes) exceeds maximum allowed ({max} bytes). \
         If this is expected, increase the limit with \
         `LimitsConfig {{ max_request_size: Some({}) }}` or use `LimitsConfig::unlimited()`",
        size
    )]
    RequestTooLarge {
        /// The actual size of the request in bytes
        size: usize,
        /// The maximum allowed size in bytes
        max: usize,
    },

    /// Response size exceeds the configured maximum limit.
    #[error(
        "Response size ({size} bytes) exceeds maximum allowed ({max} bytes). \
         If this is expected, increase the limit with \
         `LimitsConfig {{ max_response_size: Some({}) }}` or use `LimitsConfig::unlimited()`",
        size
    )]
    ResponseTooLarge {
        /// The actual size of the response in bytes
        size: usize,
        /// The maximum allowed size in bytes
        max: usize,
    },
}

impl TransportError {
    /// Returns `true` for misuse of the `start`/`send`/`close` lifecycle.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::NotStarted | Self::AlreadyStarted | Self::Closed)
    }
}

impl From<DecodeError> for TransportError {
    fn from(err: DecodeError) -> Self {
        Self::Decode {
            raw: err.raw,
            reason: err.reason,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationFailed(err.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_builder() || err.is_request() {
            Self::ConnectionFailed(err.to_string())
        } else {
            Self::ConnectionLost(err.to_string())
        }
    }
}

/// Validates that a request message size does not exceed the configured limit.
///
/// # Errors
///
/// Returns [`TransportError::RequestTooLarge`] if a limit is set and exceeded.
pub fn validate_request_size(size: usize, limits: &LimitsConfig) -> TransportResult<()> {
    if let Some(max_size) = limits.max_request_size
        && size > max_size
    {
        return Err(TransportError::RequestTooLarge {
            size,
            max: max_size,
        });
    }
    Ok(())
}

/// Validates that a response message size does not exceed the configured limit.
///
/// # Errors
///
/// Returns [`TransportError::ResponseTooLarge`] if a limit is set and exceeded.
pub fn validate_response_size(size: usize, limits: &LimitsConfig) -> TransportResult<()> {
    if let Some(max_size) = limits.max_response_size
        && size > max_size
    {
        return Err(TransportError::ResponseTooLarge {
            size,
            max: max_size,
        });
    }
    Ok(())
}
