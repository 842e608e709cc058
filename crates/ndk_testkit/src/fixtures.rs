//! Test fixtures and engine helpers.
//!
//! The engine keeps process-wide state, so tests touching it hold an
//! [`EngineSandbox`] for their whole duration.

use ndk_engine::{Envelope, ModuleFinder, Value};
use parking_lot::{Mutex, MutexGuard};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Contents of a managed options object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkOptions {
    /// Outbox directory.
    pub outbox_path: Option<String>,
    /// DSN.
    pub dsn: Option<String>,
    /// Debug flag.
    pub debug: bool,
    /// Release name.
    pub release: Option<String>,
    /// Environment.
    pub environment: Option<String>,
    /// Distribution.
    pub dist: Option<String>,
    /// Breadcrumb capacity.
    pub max_breadcrumbs: i32,
}

impl Default for SdkOptions {
    fn default() -> Self {
        Self {
            outbox_path: None,
            dsn: None,
            debug: false,
            release: None,
            environment: None,
            dist: None,
            max_breadcrumbs: 100,
        }
    }
}

impl SdkOptions {
    /// Options with the given outbox and nothing else.
    #[must_use]
    pub fn new(outbox_path: impl Into<String>) -> Self {
        Self {
            outbox_path: Some(outbox_path.into()),
            ..Self::default()
        }
    }

    /// Sets the DSN.
    #[must_use]
    pub fn dsn(mut self, dsn: impl Into<String>) -> Self {
        self.dsn = Some(dsn.into());
        self
    }

    /// Sets the debug flag.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the release.
    #[must_use]
    pub fn release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    /// Sets the environment.
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Sets the distribution.
    #[must_use]
    pub fn dist(mut self, dist: impl Into<String>) -> Self {
        self.dist = Some(dist.into());
        self
    }

    /// Sets the breadcrumb capacity.
    #[must_use]
    pub fn max_breadcrumbs(mut self, max: i32) -> Self {
        self.max_breadcrumbs = max;
        self
    }
}

/// DSN used by fixtures.
pub const TEST_DSN: &str = "https://public@sentry.example.com/42";

static ENGINE_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Exclusive use of the process-wide engine plus a scratch directory.
///
/// The engine is closed and the module finder reset on creation and again
/// on drop.
pub struct EngineSandbox {
    temp_dir: TempDir,
    _guard: MutexGuard<'static, ()>,
}

impl EngineSandbox {
    /// Waits for exclusive access and resets the engine.
    pub fn new() -> Self {
        let guard = ENGINE_LOCK.lock();
        reset_engine();
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            _guard: guard,
        }
    }

    /// The scratch directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Creates `<scratch>/<name>` and returns it.
    pub fn outbox(&self, name: &str) -> PathBuf {
        let dir = self.temp_dir.path().join(name);
        std::fs::create_dir_all(&dir).expect("Failed to create outbox");
        dir
    }

    /// Installs a module finder returning `modules`.
    pub fn set_modules(&self, modules: Value) {
        ndk_engine::set_module_finder(Arc::new(StaticModuleFinder(modules)));
    }

    /// Installs a module finder whose output can be replaced later.
    ///
    /// Replacing the output through the returned handle leaves the engine's
    /// module cache alone.
    pub fn shared_modules(&self, modules: Value) -> Arc<SharedModuleFinder> {
        let finder = Arc::new(SharedModuleFinder::new(modules));
        ndk_engine::set_module_finder(finder.clone());
        finder
    }

    /// Waits for queued envelopes to reach the transport.
    pub fn flush(&self) -> bool {
        ndk_engine::flush(Duration::from_secs(5))
    }
}

impl Default for EngineSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EngineSandbox {
    fn drop(&mut self) {
        reset_engine();
    }
}

fn reset_engine() {
    ndk_engine::close();
    ndk_engine::with_scope_mut(|scope| scope.clear());
    ndk_engine::clear_module_finder();
}

/// A module finder returning a fixed value.
#[derive(Debug, Clone)]
pub struct StaticModuleFinder(pub Value);

impl ModuleFinder for StaticModuleFinder {
    fn modules(&self) -> Value {
        self.0.clone()
    }
}

/// A module finder whose output can be swapped while installed.
#[derive(Debug)]
pub struct SharedModuleFinder {
    modules: Mutex<Value>,
    calls: AtomicUsize,
}

impl SharedModuleFinder {
    /// Creates a finder returning `modules`.
    pub fn new(modules: Value) -> Self {
        Self {
            modules: Mutex::new(modules),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replaces what the next enumeration returns.
    pub fn set(&self, modules: Value) {
        *self.modules.lock() = modules;
    }

    /// Number of enumerations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModuleFinder for SharedModuleFinder {
    fn modules(&self) -> Value {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.modules.lock().clone()
    }
}

/// Builds a module record the way the engine reports one.
pub fn module_record(code_file: &str, image_addr: u64, image_size: i32) -> Value {
    let mut image = Value::new_object();
    image.set_by_key("type", Value::new_string("elf"));
    image.set_by_key("image_addr", Value::new_string(format!("0x{image_addr:x}")));
    image.set_by_key("image_size", Value::new_int32(image_size));
    image.set_by_key("code_file", Value::new_string(code_file));
    image
}

/// Lists the files of an outbox directory, sorted by name.
pub fn outbox_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("Failed to read outbox")
        .map(|entry| entry.expect("Failed to read outbox entry").path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}

/// Parses every envelope in an outbox directory.
pub fn read_outbox(dir: &Path) -> Vec<Envelope> {
    outbox_files(dir)
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path).expect("Failed to read envelope");
            Envelope::from_slice(&bytes).expect("Failed to parse envelope")
        })
        .collect()
}

/// Captures a message event and waits until it reached the transport.
///
/// Returns false if the engine dropped the event or did not drain in time.
pub fn capture_message(message: &str) -> bool {
    let mut event = Value::new_object();
    event.set_by_key("message", Value::new_string(message));
    ndk_engine::capture_event(event).is_some() && ndk_engine::flush(Duration::from_secs(5))
}
