//! # RelayMCP SSE
//!
//! Pure, no-I/O Server-Sent Events support for the streamable HTTP transport.
//!
//! The decoder is fed whatever byte chunks the network delivers and yields
//! complete events; the chunking never changes the result.
//!
//! ```rust
//! use relaymcp_sse::SseDecoder;
//!
//! let mut decoder = SseDecoder::new();
//! assert!(decoder.feed(b"id: 5\nevent: mes").is_empty());
//! let events = decoder.feed(b"sage\ndata: {}\n\n");
//! assert_eq!(events[0].id.as_deref(), Some("5"));
//! assert_eq!(events[0].name(), "message");
//! assert_eq!(events[0].data, "{}");
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod sse;

pub use sse::{DEFAULT_EVENT_NAME, ERROR_EVENT_NAME, SseDecoder, SseEncoder, SseEvent};

/// SSE related header values.
pub mod headers {
    /// Content-Type of an SSE stream
    pub const CONTENT_TYPE_SSE: &str = "text/event-stream";
}
