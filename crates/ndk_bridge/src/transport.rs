//! Outbox transport: persists each completed envelope as its own file.
//!
//! The transport state is the outbox path buffer resolved during
//! initialization. The engine calls [`send_envelope`] from its worker
//! thread, possibly long after the initializing call returned, and runs
//! [`release_outbox_path`] once when the transport is torn down.

use crate::error::{BridgeError, BridgeResult};
use crate::marshal::OwnedBuffer;
use ndk_engine::{Envelope, Transport, TransportState};
use std::any::Any;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

/// Largest destination path accepted, terminator included.
pub const MAX_ENVELOPE_PATH: usize = 4096;

/// Creates a transport writing into `outbox_path`.
pub fn outbox_transport(outbox_path: OwnedBuffer) -> Transport {
    let mut transport = Transport::new(send_envelope);
    transport.set_state(Box::new(outbox_path));
    transport.set_free_func(release_outbox_path);
    transport
}

/// Builds `<outbox>/<id>` for an envelope.
///
/// Paths that would not fit in [`MAX_ENVELOPE_PATH`] bytes are rejected.
pub fn envelope_path(outbox: &str, id: Uuid) -> BridgeResult<PathBuf> {
    let mut encode = Uuid::encode_buffer();
    let id = id.hyphenated().encode_lower(&mut encode);

    let len = outbox.len() + 1 + id.len() + 1;
    if len > MAX_ENVELOPE_PATH {
        return Err(BridgeError::PathTooLong {
            len,
            max: MAX_ENVELOPE_PATH,
        });
    }

    let mut path = String::with_capacity(len);
    path.push_str(outbox);
    path.push('/');
    path.push_str(id);
    Ok(PathBuf::from(path))
}

/// Writes `envelope` under a fresh random name in the outbox held by
/// `state`, then releases it.
pub fn send_envelope(envelope: Envelope, state: Option<&(dyn Any + Send + Sync)>) {
    let Some(outbox) = state.and_then(|state| state.downcast_ref::<OwnedBuffer>()) else {
        warn!("outbox transport invoked without an outbox path, envelope dropped");
        return;
    };

    let path = outbox
        .as_str()
        .and_then(|outbox| envelope_path(outbox, Uuid::new_v4()));
    match path {
        Ok(path) => match envelope.write_to_file(&path) {
            Ok(()) => debug!(path = %path.display(), "envelope written to outbox"),
            Err(error) => warn!(path = %path.display(), %error, "failed to write envelope"),
        },
        Err(error) => warn!(%error, "envelope dropped"),
    }
    drop(envelope);
}

/// Releases the outbox path held as transport state.
pub fn release_outbox_path(state: TransportState) {
    match state.downcast::<OwnedBuffer>() {
        Ok(outbox) => {
            debug!(outbox = ?outbox, "releasing outbox path");
            outbox.release();
        }
        Err(_) => warn!("unexpected outbox transport state"),
    }
}
