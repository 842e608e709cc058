//! Envelope framing.
//!
//! An envelope is a header line followed by items. Each item is an item
//! header line, carrying the payload `length`, and the payload itself:
//!
//! ```text
//! {"event_id":"9ec79c33ec9942ab8353589fcb2e04dc","dsn":"..."}
//! {"type":"event","length":41}
//! {"event_id":"9ec79c33ec9942ab8353589fcb2e04dc"}
//! ```

use crate::error::{EngineError, EngineResult};
use crate::value::{timestamp_now, Value};
use std::path::Path;
use uuid::Uuid;

/// One item of an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeItem {
    headers: Value,
    payload: Vec<u8>,
}

impl EnvelopeItem {
    /// Creates an item of the given type. The length header is filled in
    /// from the payload.
    pub fn new(item_type: &str, payload: Vec<u8>) -> Self {
        let mut headers = Value::new_object();
        headers.set_by_key("type", Value::new_string(item_type));
        headers.set_by_key("length", length_value(payload.len()));
        Self { headers, payload }
    }

    /// Item headers.
    pub fn headers(&self) -> &Value {
        &self.headers
    }

    /// The `type` header, or `""`.
    pub fn item_type(&self) -> &str {
        self.headers.get_by_key("type").as_string()
    }

    /// Raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload parsed as JSON.
    pub fn payload_value(&self) -> EngineResult<Value> {
        let json: serde_json::Value = serde_json::from_slice(&self.payload)?;
        Ok(Value::from(json))
    }
}

/// A serialized event plus attachments, ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    headers: Value,
    items: Vec<EnvelopeItem>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Envelope {
    /// Creates an envelope with empty headers and no items.
    pub fn new() -> Self {
        Self {
            headers: Value::new_object(),
            items: Vec::new(),
        }
    }

    /// Wraps an event into a single-item envelope.
    ///
    /// The event's `event_id` is copied into the envelope header, and the
    /// DSN is attached when known.
    pub fn from_event(event: Value, dsn: Option<&str>) -> EngineResult<Self> {
        let payload = serde_json::to_vec(&event)?;

        let mut envelope = Self::new();
        let event_id = event.get_by_key("event_id");
        if !event_id.is_null() {
            envelope.headers.set_by_key("event_id", event_id.clone());
        }
        if let Some(dsn) = dsn {
            envelope.headers.set_by_key("dsn", Value::new_string(dsn));
        }
        envelope
            .headers
            .set_by_key("sent_at", Value::new_string(timestamp_now()));
        envelope.add_item(EnvelopeItem::new("event", payload));
        Ok(envelope)
    }

    /// Envelope headers.
    pub fn headers(&self) -> &Value {
        &self.headers
    }

    /// Envelope items in order.
    pub fn items(&self) -> &[EnvelopeItem] {
        &self.items
    }

    /// Appends an item.
    pub fn add_item(&mut self, item: EnvelopeItem) {
        self.items.push(item);
    }

    /// The event id from the header, if present and well formed.
    pub fn event_id(&self) -> Option<Uuid> {
        self.headers
            .get_by_key("event_id")
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Serializes the envelope into its wire form.
    pub fn serialize(&self) -> EngineResult<Vec<u8>> {
        let mut out = serde_json::to_vec(&self.headers)?;
        for item in &self.items {
            out.push(b'\n');
            serde_json::to_writer(&mut out, &item.headers)?;
            out.push(b'\n');
            out.extend_from_slice(&item.payload);
        }
        out.push(b'\n');
        Ok(out)
    }

    /// Writes the serialized envelope to `path`, replacing any existing file.
    pub fn write_to_file(&self, path: &Path) -> EngineResult<()> {
        let bytes = self.serialize()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Parses an envelope from its wire form.
    pub fn from_slice(bytes: &[u8]) -> EngineResult<Self> {
        let (header_line, mut rest) = split_line(bytes);
        if header_line.is_empty() {
            return Err(EngineError::invalid_envelope("missing envelope header"));
        }
        let headers = parse_object(header_line)?;

        let mut items = Vec::new();
        while !rest.is_empty() {
            let (item_line, after_header) = split_line(rest);
            if item_line.is_empty() {
                // trailing newline
                rest = after_header;
                continue;
            }
            let item_headers = parse_object(item_line)?;

            let (payload, after_payload) = match item_headers.get_by_key("length") {
                Value::Null => split_line(after_header),
                length => {
                    let len = usize::try_from(length.as_f64() as i64).map_err(|_| {
                        EngineError::invalid_envelope("negative item length")
                    })?;
                    if after_header.len() < len {
                        return Err(EngineError::invalid_envelope(format!(
                            "item payload truncated: expected {len} bytes, found {}",
                            after_header.len()
                        )));
                    }
                    let (payload, tail) = after_header.split_at(len);
                    (payload, tail.strip_prefix(b"\n").unwrap_or(tail))
                }
            };

            items.push(EnvelopeItem {
                headers: item_headers,
                payload: payload.to_vec(),
            });
            rest = after_payload;
        }

        Ok(Self { headers, items })
    }
}

fn length_value(len: usize) -> Value {
    match i32::try_from(len) {
        Ok(small) => Value::new_int32(small),
        Err(_) => Value::new_double(len as f64),
    }
}

fn split_line(bytes: &[u8]) -> (&[u8], &[u8]) {
    match bytes.iter().position(|&b| b == b'\n') {
        Some(pos) => (&bytes[..pos], &bytes[pos + 1..]),
        None => (bytes, &[]),
    }
}

fn parse_object(line: &[u8]) -> EngineResult<Value> {
    let json: serde_json::Value = serde_json::from_slice(line)?;
    match Value::from(json) {
        object @ Value::Object(_) => Ok(object),
        _ => Err(EngineError::invalid_envelope("header is not a JSON object")),
    }
}
