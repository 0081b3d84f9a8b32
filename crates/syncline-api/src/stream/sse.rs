// ── Server-Sent Events decoding ──
//
// Incremental decoder for `text/event-stream` bodies. Chunks arrive at
// arbitrary byte boundaries; complete lines are parsed as they appear
// and an event is emitted on every blank line.

use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Tag used for events that carry no `event:` field.
pub const DEFAULT_TAG: &str = "message";

/// A single decoded event: its tag plus the raw payload text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Event name, e.g. `"status"` or `"model-init"`.
    pub tag: String,
    /// Payload; multiple `data:` lines are joined with `\n`.
    pub data: String,
    /// Last event id seen on this connection, if the server sends ids.
    #[serde(default)]
    pub id: Option<String>,
}

/// Incremental `text/event-stream` decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    tag: Option<String>,
    data: Option<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the response body, returning every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, Error> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw = self.buffer.split_to(pos);
            self.buffer.advance(1);

            let line = std::str::from_utf8(&raw).map_err(|e| Error::Decode(e.to_string()))?;
            let line = line.strip_suffix('\r').unwrap_or(line);

            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        Ok(events)
    }

    fn process_line(&mut self, line: &str) -> Option<StreamEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.tag = Some(value.to_owned()),
            "data" => match self.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_owned()),
            },
            "id" if !value.contains('\0') => self.last_id = Some(value.to_owned()),
            // `retry:` and unknown fields are ignored -- the reconnect
            // interval is owned by the client configuration.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<StreamEvent> {
        let tag = self.tag.take();
        let data = self.data.take()?;
        Some(StreamEvent {
            tag: tag.filter(|t| !t.is_empty()).unwrap_or_else(|| DEFAULT_TAG.to_owned()),
            data,
            id: self.last_id.clone(),
        })
    }
}
