//! Core transport trait.

use std::future::Future;
use std::pin::Pin;

use relaymcp_protocol::JsonRpcMessage;

use crate::error::TransportResult;
use crate::transport::StreamableHttpClientTransport;

/// The operations a client session drives, independent of the wire.
///
/// Inbound traffic is not pulled through this trait; it is pushed to the
/// [`TransportHandler`](crate::TransportHandler) the transport was built with.
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Begin accepting `send()` calls.
    fn start(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Sends a single message over the transport.
    fn send(
        &self,
        message: JsonRpcMessage,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Tear the transport down. Never fails.
    fn close(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;
}

impl Transport for StreamableHttpClientTransport {
    fn start(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(StreamableHttpClientTransport::start(self))
    }

    fn send(
        &self,
        message: JsonRpcMessage,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(StreamableHttpClientTransport::send(self, message))
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            StreamableHttpClientTransport::close(self).await;
            Ok(())
        })
    }
}
