//! Server-Sent Events (SSE) encoding and decoding.
//!
//! ## SSE Format
//!
//! Events consist of `field: value` lines terminated by a blank line:
//! ```text
//! id: 5
//! event: message
//! data: {"jsonrpc":"2.0","id":1,"result":{}}
//!
//! ```
//!
//! The grammar accepted here is the subset MCP servers emit:
//!
//! - `id:` and `event:` values are trimmed; a missing event name means `message`.
//! - every `data:` line is trimmed and appended to a single buffer with no
//!   separator between lines.
//! - `:` comments, unknown fields and lines that are not UTF-8 are skipped.
//! - a blank line dispatches the pending event; leftovers at end of stream are
//!   dropped.

/// Event name assumed when an event carries no `event:` field.
pub const DEFAULT_EVENT_NAME: &str = "message";

/// Event name servers use to push a plain-text error.
pub const ERROR_EVENT_NAME: &str = "error";

/// A Server-Sent Event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Event ID for resumption support
    pub id: Option<String>,
    /// Event type (`None` means "message")
    pub event: Option<String>,
    /// Event data
    pub data: String,
}

impl SseEvent {
    /// Create a new SSE event with just data.
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// Create an `event: error` event.
    pub fn error(data: impl Into<String>) -> Self {
        Self {
            event: Some(ERROR_EVENT_NAME.to_string()),
            data: data.into(),
            ..Self::default()
        }
    }

    /// Set the event ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the event type.
    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// The effective event name, defaulting to `message`.
    pub fn name(&self) -> &str {
        self.event.as_deref().unwrap_or(DEFAULT_EVENT_NAME)
    }
}

/// Incremental SSE decoder.
///
/// Bytes are buffered until a full line is available, so lines and multi-byte
/// UTF-8 sequences may be split across any number of `feed` calls.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    current_id: Option<String>,
    current_event: Option<String>,
    current_data: String,
    has_fields: bool,
}

impl SseDecoder {
    /// Create a new SSE decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed data to the decoder and extract any complete events.
    pub fn feed(&mut self, data: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(data);

        let mut events = Vec::new();
        let mut consumed = 0;

        while let Some(offset) = self.buffer[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + offset;
            let mut line = &self.buffer[consumed..end];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }

            if line.is_empty() {
                if let Some(event) = Self::take_event(
                    &mut self.current_id,
                    &mut self.current_event,
                    &mut self.current_data,
                    &mut self.has_fields,
                ) {
                    events.push(event);
                }
            } else if let Ok(line) = std::str::from_utf8(line) {
                if let Some(value) = line.strip_prefix("id:") {
                    self.current_id = Some(value.trim().to_string());
                    self.has_fields = true;
                } else if let Some(value) = line.strip_prefix("event:") {
                    self.current_event = Some(value.trim().to_string());
                    self.has_fields = true;
                } else if let Some(value) = line.strip_prefix("data:") {
                    self.current_data.push_str(value.trim());
                    self.has_fields = true;
                }
            }

            consumed = end + 1;
        }

        self.buffer.drain(..consumed);
        events
    }

    /// Signal end of stream.
    ///
    /// Anything not terminated by a blank line is discarded; the decoder is
    /// reset and may be reused.
    pub fn finish(&mut self) {
        self.reset();
    }

    /// Reset the decoder state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.current_id = None;
        self.current_event = None;
        self.current_data.clear();
        self.has_fields = false;
    }

    /// Returns `true` if a partial line or an undispatched event is buffered.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty() || self.has_fields
    }

    fn take_event(
        id: &mut Option<String>,
        event: &mut Option<String>,
        data: &mut String,
        has_fields: &mut bool,
    ) -> Option<SseEvent> {
        if !std::mem::take(has_fields) {
            return None;
        }
        Some(SseEvent {
            id: id.take(),
            event: event.take(),
            data: std::mem::take(data),
        })
    }
}

/// SSE encoder for converting events to wire format.
#[derive(Debug)]
pub struct SseEncoder;

impl SseEncoder {
    /// Encode an SSE event to bytes.
    ///
    /// Data containing newlines is written as several `data:` lines, which
    /// [`SseDecoder`] joins back without a separator.
    pub fn encode(event: &SseEvent) -> Vec<u8> {
        Self::encode_string(event).into_bytes()
    }

    /// Encode an SSE event to a string.
    pub fn encode_string(event: &SseEvent) -> String {
        let mut output = String::new();

        if let Some(ref id) = event.id {
            output.push_str("id: ");
            output.push_str(id);
            output.push('\n');
        }

        if let Some(ref event_type) = event.event {
            output.push_str("event: ");
            output.push_str(event_type);
            output.push('\n');
        }

        for line in event.data.lines() {
            output.push_str("data: ");
            output.push_str(line);
            output.push('\n');
        }
        if event.data.is_empty() {
            output.push_str("data:\n");
        }

        output.push('\n');
        output
    }

    /// Encode a keepalive comment.
    pub fn encode_keepalive() -> &'static [u8] {
        b":\n\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sse_decoder_simple() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: hello\n\n");

        assert_eq!(events, vec![SseEvent::message("hello")]);
    }

    #[test]
    fn test_sse_decoder_full_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"id: 5\nevent: message\ndata: {\"a\":1}\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.as_deref(), Some("5"));
        assert_eq!(events[0].name(), "message");
        assert_eq!(events[0].data, "{\"a\":1}");
    }

    #[test]
    fn test_fields_are_trimmed() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"id:   7  \nevent:error  \ndata:   boom   \n\n");

        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(events[0].name(), ERROR_EVENT_NAME);
        assert_eq!(events[0].data, "boom");
    }

    #[test]
    fn test_multiple_data_lines_concatenate() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"jsonrpc\":\ndata: \"2.0\"}\n\n");

        assert_eq!(events[0].data, "{\"jsonrpc\":\"2.0\"}");
    }

    #[test]
    fn test_state_resets_between_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"id: 1\nevent: error\ndata: first\n\ndata: second\n\n");

        assert_eq!(events.len(), 2);
        assert_eq!(events[1], SseEvent::message("second"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"id: 9\r\ndata: x\r\n\r\n");

        assert_eq!(events, vec![SseEvent::message("x").with_id("9")]);
    }

    #[test]
    fn test_comments_and_unknown_fields_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keepalive\nretry: 100\nbogus line\ndata: ok\n\n");

        assert_eq!(events, vec![SseEvent::message("ok")]);
    }

    #[test]
    fn test_blank_lines_without_fields_emit_nothing() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(SseEncoder::encode_keepalive()).is_empty());
        assert!(decoder.feed(b"\n\n\n").is_empty());
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: \xff\xfe\ndata: fine\n\n");

        assert_eq!(events, vec![SseEvent::message("fine")]);
    }

    #[test]
    fn test_incremental_feed() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.feed(b"id: 1\n").is_empty());
        assert!(decoder.feed(b"data: par").is_empty());
        assert!(decoder.has_pending());

        let events = decoder.feed(b"tial\n\n");
        assert_eq!(events, vec![SseEvent::message("partial").with_id("1")]);
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: héllo\n\n".as_bytes();
        let split = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;

        assert!(decoder.feed(&bytes[..split]).is_empty());
        let events = decoder.feed(&bytes[split..]);
        assert_eq!(events[0].data, "héllo");
    }

    #[test]
    fn test_unterminated_event_is_discarded() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"id: 3\ndata: dangling\n").is_empty());

        decoder.finish();
        assert!(!decoder.has_pending());
        assert!(decoder.feed(b"\n").is_empty());
    }

    #[test]
    fn test_sse_encode_full() {
        let event = SseEvent::message("payload").with_id("evt-1").with_event("update");

        assert_eq!(
            SseEncoder::encode_string(&event),
            "id: evt-1\nevent: update\ndata: payload\n\n"
        );
    }

    #[test]
    fn test_sse_encode_error_event() {
        assert_eq!(
            SseEncoder::encode_string(&SseEvent::error("boom")),
            "event: error\ndata: boom\n\n"
        );
    }
}
