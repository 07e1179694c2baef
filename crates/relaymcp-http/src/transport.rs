//! Streamable HTTP client transport.
//!
//! - POST for every outbound message, with `Accept: application/json, text/event-stream`
//! - Immediate JSON responses and inline SSE response bodies
//! - Standalone GET event stream, opened after `notifications/initialized` is accepted
//! - `Last-Event-ID` resumability with replayed responses relabelled to the original request
//! - Session management with `mcp-session-id` and DELETE on close

use std::fmt;
use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use relaymcp_protocol::JsonRpcMessage;
use relaymcp_sse::headers::CONTENT_TYPE_SSE;

use crate::config::StreamableHttpClientConfig;
use crate::error::{
    TransportError, TransportResult, validate_request_size, validate_response_size,
};
use crate::events::TransportHandler;
use crate::metrics::TransportMetrics;
use crate::resumption::{ReplayContext, ResumptionCallback};
use crate::stream::{self, Dispatcher, StreamOrigin, StreamSession};

/// Session id assigned by the server
pub const MCP_SESSION_ID: HeaderName = HeaderName::from_static("mcp-session-id");

/// Negotiated protocol version
pub const MCP_PROTOCOL_VERSION: HeaderName = HeaderName::from_static("mcp-protocol-version");

/// Resume a stream after the given event id
pub const LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");

const ACCEPT_POST: &str = "application/json, text/event-stream";
const CONTENT_TYPE_JSON: &str = "application/json";

/// Lifecycle of a transport. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Created, `start()` not yet called
    #[default]
    NotStarted,
    /// Accepting `send()` calls
    Started,
    /// Closed; the transport cannot be restarted
    Closed,
}

/// Per-call options for [`StreamableHttpClientTransport::send_with`].
#[derive(Clone, Default)]
pub struct SendOptions {
    /// Resume the event stream after this event id instead of POSTing
    pub resumption_token: Option<String>,
    /// Called with every event id observed while serving this call
    pub on_resumption_token: Option<ResumptionCallback>,
}

impl fmt::Debug for SendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendOptions")
            .field("resumption_token", &self.resumption_token)
            .field("on_resumption_token", &self.on_resumption_token.is_some())
            .finish()
    }
}

impl SendOptions {
    /// Options that resume the stream after `token`.
    pub fn resume(token: impl Into<String>) -> Self {
        Self {
            resumption_token: Some(token.into()),
            on_resumption_token: None,
        }
    }

    /// Observe event ids as they arrive.
    #[must_use]
    pub fn with_resumption_callback(
        mut self,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_resumption_token = Some(Arc::new(callback));
        self
    }
}

/// How a response body is to be consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ContentKind {
    Json,
    EventStream,
    Other(Option<String>),
}

impl ContentKind {
    fn of(headers: &HeaderMap) -> Self {
        let Some(content_type) = headers
            .get(header::CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        else {
            return Self::Other(None);
        };

        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match media_type.as_str() {
            CONTENT_TYPE_JSON => Self::Json,
            CONTENT_TYPE_SSE => Self::EventStream,
            _ => Self::Other(Some(content_type)),
        }
    }

    fn into_content_type(self) -> Option<String> {
        match self {
            Self::Json => Some(CONTENT_TYPE_JSON.to_string()),
            Self::EventStream => Some(CONTENT_TYPE_SSE.to_string()),
            Self::Other(content_type) => content_type,
        }
    }
}

/// Streamable HTTP client transport
pub struct StreamableHttpClientTransport {
    config: StreamableHttpClientConfig,
    endpoint: Url,
    http_client: HttpClient,
    dispatcher: Dispatcher,
    state: RwLock<TransportState>,

    /// Session ID from server
    session_id: RwLock<Option<String>>,

    /// Protocol version sent on every request once known
    protocol_version: RwLock<Option<String>>,

    /// The standalone GET stream, if one is open
    stream: Mutex<Option<StreamSession>>,

    /// Parent of every stream cancellation token
    scope: CancellationToken,
}

impl fmt::Debug for StreamableHttpClientTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamableHttpClientTransport")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl StreamableHttpClientTransport {
    /// Create a transport delivering inbound traffic to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConfigurationError`] if the configuration is
    /// invalid or the HTTP client cannot be built.
    pub fn new(
        config: StreamableHttpClientConfig,
        handler: Arc<dyn TransportHandler>,
    ) -> TransportResult<Self> {
        let mut client_builder = HttpClient::builder()
            .use_rustls_tls()
            .connect_timeout(config.timeouts.connect);

        if let Some(ref user_agent) = config.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        }

        let http_client = client_builder
            .build()
            .map_err(|e| TransportError::ConfigurationError(format!("HTTP client: {e}")))?;

        Self::with_http_client(config, handler, http_client)
    }

    /// Create a transport on top of a caller-supplied HTTP client.
    ///
    /// Timeouts and user agent from `config` are not applied to `http_client`,
    /// except the per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConfigurationError`] if the configuration is invalid.
    pub fn with_http_client(
        config: StreamableHttpClientConfig,
        handler: Arc<dyn TransportHandler>,
        http_client: HttpClient,
    ) -> TransportResult<Self> {
        let endpoint = config.validate()?;
        let protocol_version = config.protocol_version.clone();

        Ok(Self {
            config,
            endpoint,
            http_client,
            dispatcher: Dispatcher::new(handler),
            state: RwLock::new(TransportState::NotStarted),
            session_id: RwLock::new(None),
            protocol_version: RwLock::new(protocol_version),
            stream: Mutex::new(None),
            scope: CancellationToken::new(),
        })
    }

    /// Move from `NotStarted` to `Started`.
    ///
    /// # Errors
    ///
    /// [`TransportError::AlreadyStarted`] if running, [`TransportError::Closed`] if closed.
    pub async fn start(&self) -> TransportResult<()> {
        let mut state = self.state.write().await;
        match *state {
            TransportState::NotStarted => {
                *state = TransportState::Started;
                info!("Streamable HTTP transport started for {}", self.endpoint);
                Ok(())
            }
            TransportState::Started => Err(TransportError::AlreadyStarted),
            TransportState::Closed => Err(TransportError::Closed),
        }
    }

    /// Send a message.
    ///
    /// # Errors
    ///
    /// See [`send_with`](Self::send_with).
    pub async fn send(&self, message: JsonRpcMessage) -> TransportResult<()> {
        self.send_with(message, SendOptions::default()).await
    }

    /// Send a message, optionally resuming an interrupted stream instead.
    ///
    /// With a resumption token nothing is POSTed: the standalone stream is
    /// reopened with `Last-Event-ID`, and responses replayed on it are
    /// relabelled to the id of `message` when it is a request.
    ///
    /// Transport failures are passed to the handler's `on_error` and returned.
    /// Undecodable payloads are passed to `on_error` only.
    ///
    /// # Errors
    ///
    /// - [`TransportError::NotStarted`] unless the transport is started
    /// - [`TransportError::HttpStatus`] for a non-success status
    /// - [`TransportError::UnexpectedContentType`] for a body that is neither JSON nor SSE
    /// - [`TransportError::ConnectionFailed`] if the server is unreachable
    /// - size and serialization errors from the outbound body
    pub async fn send_with(
        &self,
        message: JsonRpcMessage,
        options: SendOptions,
    ) -> TransportResult<()> {
        if *self.state.read().await != TransportState::Started {
            return Err(TransportError::NotStarted);
        }

        let replay_request_id = if message.is_request() {
            message.request_id().cloned()
        } else {
            None
        };

        if let Some(token) = options.resumption_token {
            debug!("Resuming event stream after {}", token);
            let replay = ReplayContext::new(replay_request_id, options.on_resumption_token);
            return self.start_stream(Some(token), replay).await;
        }

        let body = message.encode()?;
        validate_request_size(body.len(), &self.config.limits)?;
        let body_len = body.len();

        debug!("Sending message via HTTP POST");
        let request = self
            .http_client
            .post(self.endpoint.clone())
            .headers(self.build_headers().await)
            .header(header::ACCEPT, ACCEPT_POST)
            .header(header::CONTENT_TYPE, CONTENT_TYPE_JSON)
            .body(body);
        let response = self
            .with_request_timeout(request)
            .send()
            .await
            .map_err(|e| self.fail(e.into()))?;

        self.dispatcher.metrics.record_sent(body_len);

        if let Some(session_id) = response
            .headers()
            .get(&MCP_SESSION_ID)
            .and_then(|v| v.to_str().ok())
        {
            let mut current = self.session_id.write().await;
            if current.as_deref() != Some(session_id) {
                info!("Received session ID: {}", session_id);
                *current = Some(session_id.to_string());
            }
        }

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            debug!("Received HTTP 202 Accepted");
            if message.is_initialized_notification() {
                let replay = ReplayContext::new(None, options.on_resumption_token);
                self.start_stream(None, replay).await?;
            }
            return Ok(());
        }

        if !status.is_success() {
            return Err(self.fail(Self::status_error(response).await));
        }

        match ContentKind::of(response.headers()) {
            ContentKind::Json => {
                debug!("Received JSON response from POST");
                let bytes = response.bytes().await.map_err(|e| self.fail(e.into()))?;
                self.dispatcher.metrics.record_bytes_received(bytes.len());
                validate_response_size(bytes.len(), &self.config.limits)
                    .map_err(|e| self.fail(e))?;

                if !bytes.trim_ascii().is_empty() {
                    self.dispatcher.deliver_payload(&bytes);
                }
                Ok(())
            }
            ContentKind::EventStream => {
                debug!("Received SSE stream response from POST, processing events");
                let replay = ReplayContext::new(replay_request_id, options.on_resumption_token);
                stream::consume(
                    StreamOrigin::Inline,
                    response.bytes_stream(),
                    &self.dispatcher,
                    &replay,
                    &self.scope.child_token(),
                )
                .await;
                debug!("POST SSE stream processing completed");
                Ok(())
            }
            ContentKind::Other(None) => {
                let bytes = response.bytes().await.map_err(|e| self.fail(e.into()))?;
                if bytes.trim_ascii().is_empty() {
                    return Ok(());
                }
                Err(self.fail(TransportError::UnexpectedContentType { content_type: None }))
            }
            ContentKind::Other(content_type) => {
                Err(self.fail(TransportError::UnexpectedContentType { content_type }))
            }
        }
    }

    /// Close the transport.
    ///
    /// Terminates the session (best effort), stops every event stream and
    /// notifies the handler. Does nothing unless the transport is started.
    pub async fn close(&self) {
        {
            let mut state = self.state.write().await;
            if *state != TransportState::Started {
                debug!("Close ignored in state {:?}", *state);
                return;
            }
            *state = TransportState::Closed;
        }
        info!("Closing streamable HTTP transport");

        if let Err(e) = self.terminate_session().await {
            warn!("Session termination failed during close: {}", e);
        }

        if let Some(session) = self.stream.lock().await.take() {
            session.shutdown().await;
        }
        self.scope.cancel();

        self.dispatcher.closed();
        info!("Streamable HTTP transport closed");
    }

    /// End the server-side session with DELETE.
    ///
    /// A `405 Method Not Allowed` reply means the server does not support
    /// explicit termination and counts as success. On success the session id
    /// and the resumption cursor are cleared.
    ///
    /// # Errors
    ///
    /// [`TransportError::HttpStatus`] for other failures, in which case the
    /// session id is kept; connection errors if the server is unreachable.
    pub async fn terminate_session(&self) -> TransportResult<()> {
        let Some(session_id) = self.session_id.read().await.clone() else {
            return Ok(());
        };

        let request = self
            .http_client
            .delete(self.endpoint.clone())
            .headers(self.build_headers().await);
        let response = self
            .with_request_timeout(request)
            .send()
            .await
            .map_err(|e| self.fail(e.into()))?;

        let status = response.status();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            debug!("Server does not support session termination");
        } else if !status.is_success() {
            return Err(self.fail(Self::status_error(response).await));
        }

        *self.session_id.write().await = None;
        self.dispatcher.cursor.clear().await;
        info!("Session {} terminated", session_id);
        Ok(())
    }

    /// Record the protocol version negotiated during initialization.
    pub async fn set_protocol_version(&self, version: Option<String>) {
        *self.protocol_version.write().await = version;
    }

    /// The session id assigned by the server, if any.
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    /// The protocol version sent with requests, if known.
    pub async fn protocol_version(&self) -> Option<String> {
        self.protocol_version.read().await.clone()
    }

    /// The id of the last event seen on any stream.
    pub async fn last_event_id(&self) -> Option<String> {
        self.dispatcher.cursor.get().await
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> TransportState {
        *self.state.read().await
    }

    /// Returns `true` while a standalone event stream is being consumed.
    pub async fn has_standalone_stream(&self) -> bool {
        self.stream
            .lock()
            .await
            .as_ref()
            .is_some_and(|session| !session.is_finished())
    }

    /// Snapshot of the transport counters.
    pub fn metrics(&self) -> TransportMetrics {
        self.dispatcher.metrics.snapshot()
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Open the standalone stream, replacing any previous one.
    ///
    /// The slot stays locked from shutdown of the old stream until the new one
    /// is stored, so at most one consumer is ever alive.
    async fn start_stream(
        &self,
        resumption_token: Option<String>,
        replay: ReplayContext,
    ) -> TransportResult<()> {
        let mut slot = self.stream.lock().await;
        if let Some(previous) = slot.take() {
            debug!("Replacing standalone event stream");
            previous.shutdown().await;
        }

        let url = stream_url(&self.endpoint);
        info!("Starting SSE connection to {}", url);

        let mut headers = self.build_headers().await;
        headers.insert(header::ACCEPT, HeaderValue::from_static(CONTENT_TYPE_SSE));

        let last_event_id = match resumption_token {
            Some(token) => Some(token),
            None => self.dispatcher.cursor.get().await,
        };
        // An empty event id resets the cursor rather than naming an event.
        if let Some(last_event_id) = last_event_id.filter(|id| !id.is_empty())
            && let Ok(event_value) = HeaderValue::from_str(&last_event_id)
        {
            headers.insert(LAST_EVENT_ID, event_value);
        }

        let response = self
            .http_client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| self.fail(e.into()))?;

        let status = response.status();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            info!("Server does not offer a standalone event stream");
            return Ok(());
        }
        if !status.is_success() {
            return Err(self.fail(Self::status_error(response).await));
        }

        let kind = ContentKind::of(response.headers());
        if kind != ContentKind::EventStream {
            return Err(self.fail(TransportError::UnexpectedContentType {
                content_type: kind.into_content_type(),
            }));
        }

        *slot = Some(StreamSession::spawn(
            StreamOrigin::Standalone,
            response.bytes_stream(),
            self.dispatcher.clone(),
            replay,
            self.scope.child_token(),
        ));
        info!("SSE connection established");
        Ok(())
    }

    /// Custom headers plus the session and protocol headers.
    async fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for (key, value) in &self.config.headers {
            if let (Ok(k), Ok(v)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(k, v);
            }
        }

        if let Some(session_id) = self.session_id.read().await.as_ref()
            && let Ok(session_value) = HeaderValue::from_str(session_id)
        {
            headers.insert(MCP_SESSION_ID, session_value);
        }

        if let Some(version) = self.protocol_version.read().await.as_ref()
            && let Ok(protocol_value) = HeaderValue::from_str(version)
        {
            headers.insert(MCP_PROTOCOL_VERSION, protocol_value);
        }

        headers
    }

    fn with_request_timeout(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.timeouts.request {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    async fn status_error(response: Response) -> TransportError {
        let code = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        TransportError::HttpStatus { code, body }
    }

    /// Report `error` to the handler and hand it back for returning.
    fn fail(&self, error: TransportError) -> TransportError {
        self.dispatcher.report(error.clone());
        error
    }
}

/// The endpoint with query and fragment removed, used for the GET stream.
fn stream_url(endpoint: &Url) -> Url {
    let mut url = endpoint.clone();
    url.set_query(None);
    url.set_fragment(None);
    url
}
