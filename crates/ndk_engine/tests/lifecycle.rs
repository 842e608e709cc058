//! Integration tests for the global engine lifecycle.

use ndk_engine::{
    capture_event, close, flush, get_modules_list, init, is_initialized, set_module_finder,
    with_options, with_scope, Envelope, ModuleFinder, Options, Transport, TransportState, Value,
};
use parking_lot::{const_mutex, Mutex, MutexGuard};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

static SERIAL: Mutex<()> = const_mutex(());
static DELIVERED: Mutex<Vec<(String, Envelope)>> = const_mutex(Vec::new());
static FREED: AtomicUsize = AtomicUsize::new(0);

fn serial() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock();
    close();
    DELIVERED.lock().clear();
    guard
}

fn record(envelope: Envelope, _state: Option<&(dyn Any + Send + Sync)>) {
    let thread = std::thread::current().name().unwrap_or("").to_string();
    DELIVERED.lock().push((thread, envelope));
}

fn count_free(_state: TransportState) {
    FREED.fetch_add(1, Ordering::SeqCst);
}

fn recording_options(dir: &std::path::Path) -> Options {
    let mut transport = Transport::new(record);
    transport.set_state(Box::new(()));
    transport.set_free_func(count_free);
    Options::new()
        .dsn("https://public@sentry.invalid/42")
        .database_path(dir.join(".sentry-native"))
        .release("app@2.1")
        .transport(transport)
}

#[test]
fn events_reach_transport_on_worker_thread() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();

    init(recording_options(dir.path())).unwrap();
    assert!(is_initialized());
    assert!(dir.path().join(".sentry-native").is_dir());

    ndk_engine::set_tag("flavor", "release");
    let mut event = Value::new_object();
    event.set_by_key("message", Value::from("boom"));
    let id = capture_event(event).unwrap();
    assert!(flush(Duration::from_secs(5)));

    let delivered = DELIVERED.lock();
    assert_eq!(delivered.len(), 1);
    let (thread, envelope) = &delivered[0];
    assert_eq!(thread, "ndk-transport");
    assert_eq!(envelope.event_id(), Some(id));
    assert_eq!(
        envelope.headers().get_by_key("dsn").as_str(),
        Some("https://public@sentry.invalid/42")
    );

    let payload = envelope.items()[0].payload_value().unwrap();
    assert_eq!(payload.get_by_key("release").as_str(), Some("app@2.1"));
    assert_eq!(payload.get_by_key("tags").get_by_key("flavor").as_str(), Some("release"));
    drop(delivered);

    close();
}

#[test]
fn close_frees_transport_state_once_and_resets_scope() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();

    init(recording_options(dir.path())).unwrap();
    ndk_engine::set_tag("k", "v");

    let before = FREED.load(Ordering::SeqCst);
    close();
    assert_eq!(FREED.load(Ordering::SeqCst), before + 1);
    assert!(!is_initialized());
    assert!(with_scope(|scope| scope.tags().is_empty()));

    close();
    assert_eq!(FREED.load(Ordering::SeqCst), before + 1);
}

#[test]
fn reinit_replaces_previous_instance() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();

    init(recording_options(dir.path())).unwrap();
    let before = FREED.load(Ordering::SeqCst);
    init(recording_options(dir.path()).max_breadcrumbs(3)).unwrap();
    assert_eq!(FREED.load(Ordering::SeqCst), before + 1);
    assert_eq!(with_options(|o| o.max_breadcrumbs), Some(3));
    assert_eq!(with_scope(|scope| scope.max_breadcrumbs()), 3);

    close();
}

#[test]
fn capture_without_init_is_ignored() {
    let _guard = serial();
    assert!(capture_event(Value::new_object()).is_none());
    assert!(!flush(Duration::from_millis(10)));
}

#[test]
fn init_failure_drops_transport() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();

    let before = FREED.load(Ordering::SeqCst);
    let options = recording_options(dir.path()).database_path(blocker.join("db"));
    assert!(init(options).is_err());
    assert!(!is_initialized());
    assert_eq!(FREED.load(Ordering::SeqCst), before + 1);
}

struct CountingFinder {
    calls: AtomicUsize,
}

impl ModuleFinder for CountingFinder {
    fn modules(&self) -> Value {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut list = Value::new_list();
        list.append(Value::Null);
        list
    }
}

#[test]
fn module_list_is_cached_until_cleared() {
    let _guard = serial();
    let finder = Arc::new(CountingFinder {
        calls: AtomicUsize::new(0),
    });
    set_module_finder(finder.clone());

    assert_eq!(get_modules_list().len(), 1);
    assert_eq!(get_modules_list().len(), 1);
    assert_eq!(finder.calls.load(Ordering::SeqCst), 1);

    ndk_engine::clear_modulecache();
    get_modules_list();
    assert_eq!(finder.calls.load(Ordering::SeqCst), 2);

    ndk_engine::clear_module_finder();
}
