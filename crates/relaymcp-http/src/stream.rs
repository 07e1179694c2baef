//! Event stream consumption.
//!
//! A stream session owns one SSE response body, either the body of a POST
//! (inline) or the standalone GET stream, and feeds decoded events to the
//! handler. Cancellation is cooperative: the token is checked between chunks and
//! between events, and a cancelled session reports nothing.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use relaymcp_protocol::JsonRpcMessage;
use relaymcp_sse::{DEFAULT_EVENT_NAME, ERROR_EVENT_NAME, SseDecoder, SseEvent};

use crate::error::TransportError;
use crate::events::TransportHandler;
use crate::metrics::AtomicMetrics;
use crate::resumption::{ReplayContext, ResumptionCursor};

/// Where an event stream came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOrigin {
    /// The body of a POST response.
    Inline,
    /// The standalone GET stream.
    Standalone,
}

impl fmt::Display for StreamOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline => f.write_str("inline"),
            Self::Standalone => f.write_str("standalone"),
        }
    }
}

/// Routes decoded messages and errors to the handler, keeping metrics and the
/// resumption cursor up to date.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    handler: Arc<dyn TransportHandler>,
    pub(crate) cursor: ResumptionCursor,
    pub(crate) metrics: Arc<AtomicMetrics>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("cursor", &self.cursor)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub(crate) fn new(handler: Arc<dyn TransportHandler>) -> Self {
        Self {
            handler,
            cursor: ResumptionCursor::new(),
            metrics: Arc::new(AtomicMetrics::new()),
        }
    }

    pub(crate) fn deliver(&self, message: JsonRpcMessage) {
        self.metrics.messages_received.fetch_add(1, Ordering::Relaxed);
        self.handler.on_message(message);
    }

    pub(crate) fn report(&self, error: TransportError) {
        warn!("Transport error: {}", error);
        self.metrics.errors.fetch_add(1, Ordering::Relaxed);
        self.handler.on_error(error);
    }

    pub(crate) fn closed(&self) {
        self.handler.on_close();
    }

    /// Decode a buffered body and deliver it; failures are reported only.
    pub(crate) fn deliver_payload(&self, payload: &[u8]) {
        match JsonRpcMessage::decode(payload) {
            Ok(message) => self.deliver(message),
            Err(e) => self.report(e.into()),
        }
    }

    async fn dispatch_event(&self, event: SseEvent, replay: &ReplayContext) {
        if let Some(id) = event.id.as_deref() {
            self.cursor.record(id).await;
            replay.notify_token(id);
        }

        match event.name() {
            DEFAULT_EVENT_NAME => {
                if event.data.is_empty() {
                    return;
                }
                match JsonRpcMessage::decode(event.data.as_bytes()) {
                    Ok(message) => {
                        debug!("Received SSE message");
                        self.deliver(replay.relabel(message));
                    }
                    Err(e) => self.report(e.into()),
                }
            }
            ERROR_EVENT_NAME => self.report(TransportError::EventStream(event.data)),
            other => debug!("Ignoring unknown event type: {}", other),
        }
    }
}

/// Consume `body` until it ends, fails or `cancel` fires.
pub(crate) async fn consume<S, E>(
    origin: StreamOrigin,
    body: S,
    dispatcher: &Dispatcher,
    replay: &ReplayContext,
    cancel: &CancellationToken,
) where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    let metrics = Arc::clone(&dispatcher.metrics);
    let _active = metrics.stream_opened();
    let mut body = std::pin::pin!(body);
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("{} event stream cancelled", origin);
                return;
            }
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                dispatcher.metrics.record_bytes_received(bytes.len());
                for event in decoder.feed(&bytes) {
                    if cancel.is_cancelled() {
                        debug!("{} event stream cancelled", origin);
                        return;
                    }
                    dispatcher.dispatch_event(event, replay).await;
                }
            }
            Some(Err(e)) => {
                if !cancel.is_cancelled() {
                    dispatcher.report(TransportError::ConnectionLost(format!(
                        "{} event stream: {}",
                        origin, e
                    )));
                }
                return;
            }
            None => {
                if decoder.has_pending() {
                    debug!("{} event stream ended mid-event, discarding it", origin);
                }
                decoder.finish();
                debug!("{} event stream ended", origin);
                return;
            }
        }
    }
}

/// A stream consumed on its own task.
#[derive(Debug)]
pub(crate) struct StreamSession {
    origin: StreamOrigin,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl StreamSession {
    /// Spawn a consumer task for `body`.
    pub(crate) fn spawn<S, E>(
        origin: StreamOrigin,
        body: S,
        dispatcher: Dispatcher,
        replay: ReplayContext,
        cancel: CancellationToken,
    ) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            consume(origin, body, &dispatcher, &replay, &task_cancel).await;
        });

        Self {
            origin,
            cancel,
            handle,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the consumer and wait for it to exit.
    pub(crate) async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await
            && e.is_panic()
        {
            warn!("{} event stream task panicked: {}", self.origin, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{TransportEvent, TransportEventEmitter};
    use pretty_assertions::assert_eq;
    use relaymcp_protocol::RequestId;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    fn dispatcher() -> (Dispatcher, mpsc::UnboundedReceiver<TransportEvent>) {
        let (emitter, receiver) = TransportEventEmitter::new();
        (Dispatcher::new(Arc::new(emitter)), receiver)
    }

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, String>> + Send + 'static {
        let items: Vec<Result<Bytes, String>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p.as_bytes())))
            .collect();
        futures::stream::iter(items)
    }

    fn drain(receiver: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_message_event_updates_cursor_and_delivers() {
        let (dispatcher, mut receiver) = dispatcher();
        let tokens = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&tokens);
        let replay = ReplayContext::new(
            None,
            Some(Arc::new(move |t: &str| sink.lock().unwrap().push(t.to_string()))),
        );

        let body = chunks(&[
            "id: 5\nevent: mes",
            "sage\ndata: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n",
        ]);
        consume(
            StreamOrigin::Standalone,
            body,
            &dispatcher,
            &replay,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(dispatcher.cursor.get().await.as_deref(), Some("5"));
        assert_eq!(*tokens.lock().unwrap(), vec!["5".to_string()]);
        let events = drain(&mut receiver);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], TransportEvent::Message(m) if m.method() == Some("notifications/progress")));
        assert_eq!(dispatcher.metrics.snapshot().active_streams, 0);
    }

    #[tokio::test]
    async fn test_error_and_bad_json_do_not_stop_stream() {
        let (dispatcher, mut receiver) = dispatcher();
        let body = chunks(&[
            "event: error\ndata: boom\n\n",
            "data: {not json\n\n",
            "event: ping\ndata: ignored\n\n",
            "data:\n\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\n",
        ]);

        consume(
            StreamOrigin::Inline,
            body,
            &dispatcher,
            &ReplayContext::default(),
            &CancellationToken::new(),
        )
        .await;

        let events = drain(&mut receiver);
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            TransportEvent::Error(TransportError::EventStream("boom".to_string()))
        );
        assert!(matches!(events[1], TransportEvent::Error(TransportError::Decode { .. })));
        assert!(matches!(&events[2], TransportEvent::Message(m) if m.is_response()));
        assert_eq!(dispatcher.metrics.snapshot().errors, 2);
    }

    #[tokio::test]
    async fn test_replayed_responses_are_relabelled() {
        let (dispatcher, mut receiver) = dispatcher();
        let replay = ReplayContext::new(Some(RequestId::from("original")), None);
        let body = chunks(&["id: 9\ndata: {\"jsonrpc\":\"2.0\",\"id\":42,\"result\":{}}\n\n"]);

        consume(
            StreamOrigin::Standalone,
            body,
            &dispatcher,
            &replay,
            &CancellationToken::new(),
        )
        .await;

        match drain(&mut receiver).pop() {
            Some(TransportEvent::Message(message)) => {
                assert_eq!(message.request_id(), Some(&RequestId::from("original")));
            }
            other => panic!("expected a message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_read_error_reported_once() {
        let (dispatcher, mut receiver) = dispatcher();
        let body = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"jsonrpc\":\"2.0\",\"method\":\"a\"}\n\n")),
            Err("reset by peer".to_string()),
            Ok(Bytes::from_static(b"data: {\"jsonrpc\":\"2.0\",\"method\":\"b\"}\n\n")),
        ]);

        consume(
            StreamOrigin::Standalone,
            body,
            &dispatcher,
            &ReplayContext::default(),
            &CancellationToken::new(),
        )
        .await;

        let events = drain(&mut receiver);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], TransportEvent::Error(TransportError::ConnectionLost(m)) if m.contains("reset by peer")));
    }

    #[tokio::test]
    async fn test_shutdown_is_silent() {
        let (dispatcher, mut receiver) = dispatcher();
        let body = futures::stream::pending::<Result<Bytes, String>>();

        let session = StreamSession::spawn(
            StreamOrigin::Standalone,
            body,
            dispatcher.clone(),
            ReplayContext::default(),
            CancellationToken::new(),
        );
        tokio::task::yield_now().await;
        assert!(!session.is_finished());

        session.shutdown().await;
        assert!(drain(&mut receiver).is_empty());
        assert_eq!(dispatcher.metrics.snapshot().active_streams, 0);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_dispatch() {
        let (dispatcher, mut receiver) = dispatcher();
        let cancel = CancellationToken::new();
        cancel.cancel();

        consume(
            StreamOrigin::Inline,
            chunks(&["data: {\"jsonrpc\":\"2.0\",\"method\":\"a\"}\n\n"]),
            &dispatcher,
            &ReplayContext::default(),
            &cancel,
        )
        .await;

        assert!(drain(&mut receiver).is_empty());
    }
}
