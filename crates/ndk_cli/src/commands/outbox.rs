//! Outbox commands.

use ndk_engine::{Envelope, Value};
use serde::Serialize;
use std::path::Path;

/// One pending envelope file.
#[derive(Debug, Serialize)]
pub struct EnvelopeSummary {
    /// File name.
    pub file: String,
    /// File size in bytes.
    pub size: u64,
    /// Event id from the envelope header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Item types in order.
    pub items: Vec<String>,
    /// Parse failure, if the file is not a valid envelope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summarizes every file in an outbox directory.
pub fn summarize(dir: &Path) -> Result<Vec<EnvelopeSummary>, Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("No outbox found at {:?}", dir).into());
    }

    let mut summaries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let mut summary = EnvelopeSummary {
            file: entry.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
            event_id: None,
            items: Vec::new(),
            error: None,
        };
        match Envelope::from_slice(&std::fs::read(entry.path())?) {
            Ok(envelope) => {
                summary.event_id = envelope.event_id().map(|id| id.to_string());
                summary.items = envelope
                    .items()
                    .iter()
                    .map(|item| item.item_type().to_string())
                    .collect();
            }
            Err(error) => summary.error = Some(error.to_string()),
        }
        summaries.push(summary);
    }
    summaries.sort_by(|a, b| a.file.cmp(&b.file));
    Ok(summaries)
}

/// Runs `outbox list`.
pub fn list(dir: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let summaries = summarize(dir)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        _ => {
            println!("Outbox: {}", dir.display());
            println!("Envelopes: {}", summaries.len());
            for summary in &summaries {
                match &summary.error {
                    Some(error) => println!(
                        "  {} ({} bytes) invalid: {}",
                        summary.file, summary.size, error
                    ),
                    None => println!(
                        "  {} ({} bytes) event {} [{}]",
                        summary.file,
                        summary.size,
                        summary.event_id.as_deref().unwrap_or("-"),
                        summary.items.join(", ")
                    ),
                }
            }
        }
    }

    Ok(())
}

/// Renders an envelope as a structured value, decoding JSON payloads.
pub fn envelope_value(envelope: &Envelope) -> Value {
    let mut items = Value::new_list();
    for item in envelope.items() {
        let mut rendered = Value::new_object();
        rendered.set_by_key("headers", item.headers().clone());
        let payload = item
            .payload_value()
            .unwrap_or_else(|_| Value::new_string(String::from_utf8_lossy(item.payload())));
        rendered.set_by_key("payload", payload);
        items.append(rendered);
    }

    let mut value = Value::new_object();
    value.set_by_key("headers", envelope.headers().clone());
    value.set_by_key("items", items);
    value
}

/// Runs `outbox show`.
pub fn show(file: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let envelope = Envelope::from_slice(&std::fs::read(file)?)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&envelope_value(&envelope))?);
        }
        _ => {
            println!("Envelope: {}", file.display());
            println!("Headers: {}", serde_json::to_string(envelope.headers())?);
            for (index, item) in envelope.items().iter().enumerate() {
                println!();
                println!("Item {} ({}, {} bytes)", index, item.item_type(), item.payload().len());
                match item.payload_value() {
                    Ok(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
                    Err(_) => println!("{}", String::from_utf8_lossy(item.payload())),
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_event(dir: &Path, name: &str, message: &str) {
        let mut event = Value::new_object();
        event.set_by_key("event_id", Value::new_string("9ec79c33ec9942ab8353589fcb2e04dc"));
        event.set_by_key("message", Value::new_string(message));
        let envelope = Envelope::from_event(event, None).unwrap();
        envelope.write_to_file(&dir.join(name)).unwrap();
    }

    #[test]
    fn summaries_are_sorted_and_flag_garbage() {
        let dir = tempfile::tempdir().unwrap();
        write_event(dir.path(), "b", "second");
        write_event(dir.path(), "a", "first");
        std::fs::write(dir.path().join("c"), b"not an envelope\n").unwrap();

        let summaries = summarize(dir.path()).unwrap();
        let names: Vec<&str> = summaries.iter().map(|s| s.file.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(
            summaries[0].event_id.as_deref(),
            Some("9ec79c33-ec99-42ab-8353-589fcb2e04dc")
        );
        assert_eq!(summaries[0].items, ["event"]);
        assert!(summaries[2].error.is_some());
    }

    #[test]
    fn missing_outbox_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(summarize(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn rendered_envelope_decodes_payload() {
        let dir = tempfile::tempdir().unwrap();
        write_event(dir.path(), "e", "hello");
        let envelope = Envelope::from_slice(&std::fs::read(dir.path().join("e")).unwrap()).unwrap();

        let value = envelope_value(&envelope);
        let payload = value.get_by_key("items").get_by_index(0).get_by_key("payload");
        assert_eq!(payload.get_by_key("message").as_str(), Some("hello"));
    }
}
