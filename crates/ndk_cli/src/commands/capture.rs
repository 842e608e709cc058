//! Capture command implementation.

use ndk_bridge::options::derive_database_path;
use ndk_bridge::transport::outbox_transport;
use ndk_bridge::OwnedBuffer;
use ndk_engine::{Options, Value};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Result of a capture.
#[derive(Debug, Serialize)]
pub struct CaptureResult {
    /// Id of the captured event.
    pub event_id: String,
    /// Outbox the envelope was written to.
    pub outbox: String,
}

/// Initializes the engine with an outbox transport and captures one event.
pub fn capture(
    outbox: &Path,
    dsn: &str,
    message: &str,
    debug: bool,
) -> Result<CaptureResult, Box<dyn std::error::Error>> {
    let outbox_str = outbox
        .to_str()
        .ok_or_else(|| format!("Outbox path is not valid UTF-8: {:?}", outbox))?;
    std::fs::create_dir_all(outbox)?;

    let options = Options::new()
        .dsn(dsn)
        .debug(debug)
        .database_path(derive_database_path(outbox_str))
        .transport(outbox_transport(OwnedBuffer::from(outbox_str)));
    ndk_engine::init(options)?;

    let mut event = Value::new_object();
    event.set_by_key("message", Value::new_string(message));
    event.set_by_key("level", Value::new_string("info"));
    let event_id = ndk_engine::capture_event(event);

    // close drains the transport before returning
    ndk_engine::close();

    let event_id = event_id.ok_or("Event was not captured")?;
    info!(%event_id, "event captured");
    Ok(CaptureResult {
        event_id: event_id.to_string(),
        outbox: outbox.display().to_string(),
    })
}

/// Runs the capture command.
pub fn run(
    outbox: &Path,
    dsn: &str,
    message: &str,
    debug: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = capture(outbox, dsn, message, debug)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("Captured event {}", result.event_id);
            println!("Outbox: {}", result.outbox);
        }
    }

    Ok(())
}
