//! Caller-facing sink for inbound messages, errors and close notifications.

use tokio::sync::mpsc;

use relaymcp_protocol::JsonRpcMessage;

use crate::error::TransportError;

/// Receives everything the transport delivers outside of `send()` return values.
///
/// Callbacks run on transport tasks and must not block; hand work off to a
/// channel or spawn if it is expensive. [`TransportEventEmitter`] is a ready-made
/// channel-backed implementation.
pub trait TransportHandler: Send + Sync {
    /// A decoded message arrived, from a POST response or an event stream.
    fn on_message(&self, message: JsonRpcMessage);

    /// A transport or protocol error occurred.
    fn on_error(&self, error: TransportError);

    /// The transport finished closing. Called exactly once.
    fn on_close(&self) {}
}

/// Represents events forwarded by [`TransportEventEmitter`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A message was received.
    Message(JsonRpcMessage),

    /// An error was reported.
    Error(TransportError),

    /// The transport closed.
    Closed,
}

/// A [`TransportHandler`] that forwards every callback into an unbounded channel.
#[derive(Debug, Clone)]
pub struct TransportEventEmitter {
    sender: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportEventEmitter {
    /// Creates a new event emitter and a corresponding receiver.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Emits an event, dropping it if the receiver is gone.
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.sender.send(event);
    }
}

impl TransportHandler for TransportEventEmitter {
    fn on_message(&self, message: JsonRpcMessage) {
        self.emit(TransportEvent::Message(message));
    }

    fn on_error(&self, error: TransportError) {
        self.emit(TransportEvent::Error(error));
    }

    fn on_close(&self) {
        self.emit(TransportEvent::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaymcp_protocol::JsonRpcNotification;

    #[tokio::test]
    async fn test_transport_event_emitter() {
        let (emitter, mut receiver) = TransportEventEmitter::new();

        emitter.on_message(JsonRpcNotification::without_params("ping").into());
        emitter.on_error(TransportError::StreamClosed);
        emitter.on_close();

        assert!(matches!(
            receiver.recv().await,
            Some(TransportEvent::Message(JsonRpcMessage::Notification(_)))
        ));
        assert_eq!(
            receiver.recv().await,
            Some(TransportEvent::Error(TransportError::StreamClosed))
        );
        assert_eq!(receiver.recv().await, Some(TransportEvent::Closed));
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (emitter, receiver) = TransportEventEmitter::new();
        drop(receiver);
        emitter.on_close();
    }
}
