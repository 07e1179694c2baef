//! Transport configuration types.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{TransportError, TransportResult};

/// Configuration for request and response size limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum buffered JSON response body size in bytes.
    /// `None` = unlimited
    pub max_response_size: Option<usize>,

    /// Maximum POST body size in bytes.
    /// `None` = unlimited
    pub max_request_size: Option<usize>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_response_size: Some(10 * 1024 * 1024), // 10MB
            max_request_size: Some(1024 * 1024),       // 1MB
        }
    }
}

impl LimitsConfig {
    /// Create a configuration with no limits.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_response_size: None,
            max_request_size: None,
        }
    }

    /// Create a configuration with strict limits for untrusted servers.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            max_response_size: Some(1024 * 1024), // 1MB
            max_request_size: Some(256 * 1024),   // 256KB
        }
    }
}

/// Configuration for connection and request timeouts.
///
/// Event streams are long-lived, so the per-request timeout defaults to `None`;
/// when set it bounds POST and DELETE exchanges only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection establishment timeout.
    pub connect: Duration,

    /// Single POST/DELETE request timeout.
    /// `None` = no timeout
    pub request: Option<Duration>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            request: None,
        }
    }
}

impl TimeoutConfig {
    /// Create a configuration with short timeouts for fast operations.
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            connect: Duration::from_secs(5),
            request: Some(Duration::from_secs(10)),
        }
    }

    /// Create a configuration with long timeouts for slow operations.
    #[must_use]
    pub const fn patient() -> Self {
        Self {
            connect: Duration::from_secs(60),
            request: Some(Duration::from_secs(300)), // 5 minutes
        }
    }
}

/// Streamable HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamableHttpClientConfig {
    /// Full MCP endpoint URL (e.g., <https://api.example.com/mcp>)
    pub endpoint: String,

    /// Custom headers sent with every request, passed through verbatim
    pub headers: HashMap<String, String>,

    /// User agent string (set to None to disable User-Agent header)
    ///
    /// Default: `RelayMCP-Client/{version}`
    pub user_agent: Option<String>,

    /// Protocol version sent as `mcp-protocol-version`, if known up front
    pub protocol_version: Option<String>,

    /// Connection and request timeouts
    pub timeouts: TimeoutConfig,

    /// Size limits for requests and responses
    pub limits: LimitsConfig,
}

impl Default for StreamableHttpClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/mcp".to_string(),
            headers: HashMap::new(),
            user_agent: Some(format!("RelayMCP-Client/{}", env!("CARGO_PKG_VERSION"))),
            protocol_version: None,
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl StreamableHttpClientConfig {
    /// Create a configuration for the given endpoint with default settings.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Add a custom header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the user agent, or `None` to send none.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Set the protocol version sent before one is negotiated.
    #[must_use]
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = Some(version.into());
        self
    }

    /// Set timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set size limits.
    #[must_use]
    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Check the configuration and return the parsed endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConfigurationError`] if the endpoint is not an
    /// absolute `http`/`https` URL or a custom header is not a valid HTTP header.
    pub fn validate(&self) -> TransportResult<Url> {
        let url = Url::parse(&self.endpoint).map_err(|e| {
            TransportError::ConfigurationError(format!("invalid endpoint '{}': {e}", self.endpoint))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::ConfigurationError(format!(
                "endpoint scheme must be http or https, got '{}'",
                url.scheme()
            )));
        }

        for (name, value) in &self.headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(TransportError::ConfigurationError(format!(
                    "invalid header name '{name}'"
                )));
            }
            if HeaderValue::from_str(value).is_err() {
                return Err(TransportError::ConfigurationError(format!(
                    "invalid value for header '{name}'"
                )));
            }
        }

        Ok(url)
    }
}
