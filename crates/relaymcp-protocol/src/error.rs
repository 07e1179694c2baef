//! Decode errors for the message envelope.

use thiserror::Error;

/// Longest raw payload kept verbatim inside a [`DecodeError`].
const MAX_RAW_LEN: usize = 4096;

/// A payload could not be decoded as a JSON-RPC 2.0 message.
///
/// Raised both for malformed JSON and for well-formed JSON that matches none of
/// the request, notification or response shapes. Consumers treat it as a
/// per-message failure; it never terminates a stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to decode JSON-RPC message: {reason}")]
pub struct DecodeError {
    /// The offending payload, lossily converted to UTF-8 and truncated.
    pub raw: String,
    /// Why decoding failed.
    pub reason: String,
}

impl DecodeError {
    /// Build a decode error from the raw bytes and the underlying reason.
    pub fn new(raw: &[u8], reason: impl Into<String>) -> Self {
        let mut raw = String::from_utf8_lossy(raw).into_owned();
        if raw.len() > MAX_RAW_LEN {
            let mut cut = MAX_RAW_LEN;
            while !raw.is_char_boundary(cut) {
                cut -= 1;
            }
            raw.truncate(cut);
        }
        Self {
            raw,
            reason: reason.into(),
        }
    }
}
