//! Server-Sent Events encoding and decoding (spec §4.4): one JSON-RPC
//! message per `data` field, framed with a strictly-monotonic `id` per
//! `(sessionId, streamId)` so a client can resume with `Last-Event-ID`.

use std::fmt;

/// One SSE event on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// Event id, used for `Last-Event-ID` resumption.
    pub id: Option<String>,
    /// Event type; MCP always uses the default `message` type.
    pub event: Option<String>,
    /// Event payload — one minified JSON-RPC message.
    pub data: String,
}

impl SseEvent {
    /// An event carrying just a data payload, no id.
    #[must_use]
    pub fn message(data: impl Into<String>) -> Self {
        Self { id: None, event: None, data: data.into() }
    }

    /// An event carrying a resumption id and a data payload.
    #[must_use]
    pub fn with_id(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self { id: Some(id.into()), event: None, data: data.into() }
    }

    /// Render this event to wire format, terminated by a blank line.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if let Some(id) = &self.id {
            out.push_str("id: ");
            out.push_str(id);
            out.push('\n');
        }
        if let Some(event) = &self.event {
            out.push_str("event: ");
            out.push_str(event);
            out.push('\n');
        }
        for line in self.data.lines() {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

impl fmt::Display for SseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// An SSE comment line, used for keepalive pings; ignored by clients but
/// keeps an idle connection from timing out at intermediaries.
#[must_use]
pub fn keepalive() -> String {
    ":\n\n".to_string()
}

/// Incrementally parses a byte stream into complete [`SseEvent`]s.
#[derive(Default)]
pub struct SseDecoder {
    buffer: String,
    id: Option<String>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// A fresh decoder with no buffered state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed newly-received bytes in, returning any events completed by
    /// this chunk. Invalid UTF-8 is dropped silently (SSE is text-only).
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let Ok(text) = std::str::from_utf8(chunk) else {
            return Vec::new();
        };
        self.buffer.push_str(text);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line = self.buffer[..pos].to_string();
            self.buffer.drain(..=pos);

            if line.is_empty() {
                if let Some(event) = self.emit() {
                    events.push(event);
                }
            } else if line.starts_with(':') {
                // comment / keepalive, ignore
            } else if let Some(colon) = line.find(':') {
                let field = &line[..colon];
                let value = line[colon + 1..].trim_start();
                match field {
                    "id" => self.id = Some(value.to_string()),
                    "event" => self.event = Some(value.to_string()),
                    "data" => self.data.push(value.to_string()),
                    _ => {}
                }
            }
        }
        events
    }

    fn emit(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            self.id = None;
            self.event = None;
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some(SseEvent { id: self.id.take(), event: self.event.take(), data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_plain_message() {
        let event = SseEvent::message("hello");
        assert_eq!(event.encode(), "data: hello\n\n");
    }

    #[test]
    fn encodes_with_id() {
        let event = SseEvent::with_id("1", "{}");
        assert_eq!(event.encode(), "id: 1\ndata: {}\n\n");
    }

    #[test]
    fn decodes_single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"id: 1\ndata: hello\n\n");
        assert_eq!(events, vec![SseEvent::with_id("1", "hello")]);
    }

    #[test]
    fn decodes_incrementally_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"id: 1\n").is_empty());
        assert!(decoder.feed(b"data: partial\n").is_empty());
        let events = decoder.feed(b"\n");
        assert_eq!(events, vec![SseEvent::with_id("1", "partial")]);
    }

    #[test]
    fn decodes_multiline_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: line1\ndata: line2\n\n");
        assert_eq!(events[0].data, "line1\nline2");
    }

    #[test]
    fn ignores_comment_lines() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keepalive\ndata: real\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "real");
    }

    #[test]
    fn round_trips_through_encode_and_decode() {
        let original = SseEvent::with_id("42", "payload");
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(original.encode().as_bytes());
        assert_eq!(events, vec![original]);
    }
}
