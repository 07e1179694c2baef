//! Resumption cursor and replay correlation.
//!
//! Every event id seen on any stream advances the cursor. A stream reopened
//! with a resumption token on behalf of a request carries that request's id, and
//! every response replayed on it is relabelled to that id.

use std::sync::Arc;

use tokio::sync::RwLock;

use relaymcp_protocol::{JsonRpcMessage, RequestId};

/// Invoked with each event id as it is recorded, so the caller can persist a
/// token for a later resume.
pub type ResumptionCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// The last event id observed on any stream of the session.
#[derive(Debug, Clone, Default)]
pub struct ResumptionCursor {
    inner: Arc<RwLock<Option<String>>>,
}

impl ResumptionCursor {
    /// Create an empty cursor.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current cursor value.
    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    /// Advance the cursor to `event_id`.
    pub(crate) async fn record(&self, event_id: &str) {
        *self.inner.write().await = Some(event_id.to_string());
    }

    /// Forget the cursor.
    pub(crate) async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

/// Per-stream replay state.
#[derive(Clone, Default)]
pub struct ReplayContext {
    /// Id of the request whose responses this stream carries.
    pub replay_request_id: Option<RequestId>,
    /// Notified of each event id on this stream.
    pub on_resumption_token: Option<ResumptionCallback>,
}

impl std::fmt::Debug for ReplayContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayContext")
            .field("replay_request_id", &self.replay_request_id)
            .field("on_resumption_token", &self.on_resumption_token.is_some())
            .finish()
    }
}

impl ReplayContext {
    /// Context for a stream replaying responses to `request_id`.
    pub fn new(
        replay_request_id: Option<RequestId>,
        on_resumption_token: Option<ResumptionCallback>,
    ) -> Self {
        Self {
            replay_request_id,
            on_resumption_token,
        }
    }

    /// Relabel a response to the replay request id; other messages pass through.
    pub fn relabel(&self, message: JsonRpcMessage) -> JsonRpcMessage {
        match (message, &self.replay_request_id) {
            (JsonRpcMessage::Response(response), Some(id)) => {
                JsonRpcMessage::Response(response.with_id(id.clone()))
            }
            (message, _) => message,
        }
    }

    /// Forward an event id to the callback, if any.
    pub fn notify_token(&self, event_id: &str) {
        if let Some(callback) = &self.on_resumption_token {
            callback(event_id);
        }
    }
}
