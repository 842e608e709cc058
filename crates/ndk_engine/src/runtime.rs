//! Process-wide engine lifecycle.
//!
//! [`init`] installs the options and starts the transport worker; [`close`]
//! tears both down again. Between the two, [`capture_event`] turns events
//! into envelopes and queues them for the worker thread, which is the only
//! thread that ever calls the transport.

use crate::envelope::Envelope;
use crate::error::EngineResult;
use crate::options::Options;
use crate::scope::with_scope_mut;
use crate::transport::Transport;
use crate::value::{timestamp_now, Value};
use parking_lot::{const_rwlock, RwLock};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

static RUNTIME: RwLock<Option<Runtime>> = const_rwlock(None);

struct Runtime {
    options: Options,
    worker: Option<TransportWorker>,
}

enum Task {
    Send(Envelope),
    Flush(Sender<()>),
}

/// Owns the transport on a dedicated thread.
struct TransportWorker {
    sender: Option<Sender<Task>>,
    handle: Option<JoinHandle<()>>,
}

impl TransportWorker {
    fn spawn(transport: Transport) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Task>();
        let handle = thread::Builder::new()
            .name("ndk-transport".to_string())
            .spawn(move || {
                for task in receiver {
                    match task {
                        Task::Send(envelope) => transport.send(envelope),
                        Task::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                // The transport, and with it its state, is released here.
                drop(transport);
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    fn send(&self, envelope: Envelope) -> bool {
        self.sender
            .as_ref()
            .is_some_and(|sender| sender.send(Task::Send(envelope)).is_ok())
    }

    fn flush(&self, timeout: Duration) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        let (done, wait) = mpsc::channel();
        if sender.send(Task::Flush(done)).is_err() {
            return false;
        }
        wait.recv_timeout(timeout).is_ok()
    }
}

impl Drop for TransportWorker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("transport worker panicked");
            }
        }
    }
}

/// Initializes the engine with `options`, taking ownership of them.
///
/// A running instance is closed first. The database directory is created
/// if missing; if that fails the options (and their transport) are dropped
/// and the engine stays uninitialized.
pub fn init(mut options: Options) -> EngineResult<()> {
    close();

    std::fs::create_dir_all(&options.database_path)?;

    let worker = options
        .transport
        .take()
        .map(TransportWorker::spawn)
        .transpose()?;

    with_scope_mut(|scope| scope.set_max_breadcrumbs(options.max_breadcrumbs));

    if options.debug {
        info!(
            database_path = %options.database_path.display(),
            has_transport = worker.is_some(),
            auto_session_tracking = options.auto_session_tracking,
            "native engine initialized"
        );
    }
    *RUNTIME.write() = Some(Runtime { options, worker });
    Ok(())
}

/// Returns true between a successful [`init`] and [`close`].
pub fn is_initialized() -> bool {
    RUNTIME.read().is_some()
}

/// Runs `f` with the active options, if initialized.
pub fn with_options<R>(f: impl FnOnce(&Options) -> R) -> Option<R> {
    RUNTIME.read().as_ref().map(|runtime| f(&runtime.options))
}

/// Captures an event and queues it for the transport.
///
/// The event gets an `event_id`, a `timestamp` and `platform` if missing,
/// the configured release, environment and dist, and the current scope.
/// Returns the event id, or `None` when the engine is not initialized or
/// the event is not an object.
pub fn capture_event(mut event: Value) -> Option<Uuid> {
    let guard = RUNTIME.read();
    let runtime = guard.as_ref()?;

    if !matches!(event, Value::Object(_)) {
        debug!("ignoring non-object event");
        return None;
    }

    let event_id = Uuid::new_v4();
    event.set_by_key("event_id", Value::new_string(event_id.simple().to_string()));
    set_default(&mut event, "timestamp", || Value::new_string(timestamp_now()));
    set_default(&mut event, "platform", || Value::new_string("native"));
    set_default(&mut event, "level", || Value::new_string("error"));

    let options = &runtime.options;
    for (key, value) in [
        ("release", &options.release),
        ("environment", &options.environment),
        ("dist", &options.dist),
    ] {
        if let Some(value) = value {
            set_default(&mut event, key, || Value::new_string(value.as_str()));
        }
    }
    with_scope_mut(|scope| scope.apply_to_event(&mut event));

    let envelope = match Envelope::from_event(event, options.dsn.as_deref()) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(%error, "failed to build envelope");
            return None;
        }
    };

    match &runtime.worker {
        Some(worker) if worker.send(envelope) => {}
        Some(_) => warn!("transport worker is gone, envelope dropped"),
        None => debug!("no transport configured, envelope dropped"),
    }
    Some(event_id)
}

fn set_default(event: &mut Value, key: &str, value: impl FnOnce() -> Value) {
    if event.get_by_key(key).is_null() {
        event.set_by_key(key, value());
    }
}

/// Waits until every envelope queued so far has been handed to the
/// transport. Returns false on timeout or when there is no transport.
pub fn flush(timeout: Duration) -> bool {
    RUNTIME
        .read()
        .as_ref()
        .and_then(|runtime| runtime.worker.as_ref())
        .is_some_and(|worker| worker.flush(timeout))
}

/// Shuts the engine down.
///
/// Queued envelopes are flushed (bounded by the shutdown timeout), the
/// worker thread is joined, the transport is dropped, which releases its
/// state exactly once, and the scope is reset. Does nothing when the
/// engine is not initialized.
pub fn close() {
    let Some(runtime) = RUNTIME.write().take() else {
        return;
    };

    if let Some(worker) = &runtime.worker {
        if !worker.flush(runtime.options.shutdown_timeout) {
            warn!("transport did not drain before shutdown");
        }
    }
    let debug = runtime.options.debug;
    drop(runtime);

    with_scope_mut(|scope| scope.clear());
    if debug {
        info!("native engine closed");
    }
}
