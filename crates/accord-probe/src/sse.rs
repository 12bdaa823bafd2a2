//! Minimal server-sent-events parsing.
//!
//! Only the subset the transport emits is handled: `data:` lines grouped
//! into events by blank lines. Comments (`:`), `event:`, `id:` and `retry:`
//! fields are skipped.

use bytes::{Buf, BytesMut};

/// Incremental SSE parser fed from a byte stream.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: BytesMut,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the data payloads of any events completed
    /// by it. Multiple `data:` lines in one event are joined with `\n`.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data_lines.is_empty() {
                    events.push(self.data_lines.join("\n"));
                    self.data_lines.clear();
                }
            } else if let Some(rest) = line.strip_prefix("data:") {
                self.data_lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            }
            // Other field names and comments are not used by the transport.
        }

        events
    }

    /// Flush a trailing event that was never terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        self.buf.advance(self.buf.remaining());
        if self.data_lines.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.data_lines).join("\n"))
        }
    }
}

/// Whether a complete response body looks like an event stream rather
/// than plain JSON.
pub fn looks_like_event_stream(body: &str) -> bool {
    body.starts_with("event:") || body.starts_with("data:") || body.contains("\ndata:")
}

/// Extract the first event's data payload from a complete SSE body.
pub fn first_data_payload(body: &str) -> Option<String> {
    let mut parser = SseParser::new();
    let mut events = parser.feed(body.as_bytes());
    if events.is_empty() {
        parser.finish()
    } else {
        Some(events.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_event() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: {\"a\":1}\n\n");
        assert_eq!(events, vec![r#"{"a":1}"#]);
    }

    #[test]
    fn reassembles_split_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: {\"a\"").is_empty());
        assert!(parser.feed(b":1}\n").is_empty());
        let events = parser.feed(b"\ndata: {\"b\":2}\n\n");
        assert_eq!(events, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn skips_comments_and_other_fields() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keep-alive\nevent: message\nid: 7\ndata: x\n\n");
        assert_eq!(events, vec!["x"]);
    }

    #[test]
    fn joins_multi_line_data() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: one\ndata: two\n\n");
        assert_eq!(events, vec!["one\ntwo"]);
    }

    #[test]
    fn handles_crlf() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: x\r\n\r\n");
        assert_eq!(events, vec!["x"]);
    }

    #[test]
    fn unwraps_sse_wrapped_response_body() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\"}\n\n";
        assert!(looks_like_event_stream(body));
        assert_eq!(first_data_payload(body).as_deref(), Some(r#"{"jsonrpc":"2.0"}"#));
        assert!(!looks_like_event_stream(r#"{"jsonrpc":"2.0"}"#));
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: tail\n").is_empty());
        assert_eq!(parser.finish().as_deref(), Some("tail"));
    }
}
