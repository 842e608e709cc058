//! Engine startup from a managed options object.
//!
//! [`init_native`] reads the managed configuration through its accessors,
//! assembles engine [`Options`] with an outbox transport and hands them to
//! the engine. Setup is all-or-nothing: any failure drops everything built
//! so far (the transport's free function releases the outbox path) and
//! leaves the engine untouched.

use crate::error::{clear_last_error, set_last_error, BridgeError, BridgeResult};
use crate::managed::ManagedRuntime;
use crate::marshal::call_string_accessor;
use crate::transport::outbox_transport;
use ndk_engine::Options;
use tracing::{debug, warn};

/// Name of the engine database directory, created next to the outbox.
pub const DATABASE_DIR_NAME: &str = ".sentry-native";

/// Accessor returning the outbox directory.
pub const GET_OUTBOX_PATH: &str = "getOutboxPath";
/// Accessor returning the DSN.
pub const GET_DSN: &str = "getDsn";
/// Accessor returning the debug flag.
pub const IS_DEBUG: &str = "isDebug";
/// Accessor returning the release name.
pub const GET_RELEASE: &str = "getRelease";
/// Accessor returning the environment.
pub const GET_ENVIRONMENT: &str = "getEnvironment";
/// Accessor returning the distribution.
pub const GET_DIST: &str = "getDist";
/// Accessor returning the breadcrumb capacity.
pub const GET_MAX_BREADCRUMBS: &str = "getMaxBreadcrumbs";

/// Derives the engine database path from the outbox path.
///
/// Everything after the last `/` is replaced with [`DATABASE_DIR_NAME`].
/// A path without a separator is used unchanged.
pub fn derive_database_path(outbox: &str) -> String {
    match outbox.rfind('/') {
        Some(pos) => format!("{}{}", &outbox[..=pos], DATABASE_DIR_NAME),
        None => outbox.to_string(),
    }
}

/// Builds engine options from the managed options object.
pub fn build_options<R: ManagedRuntime + ?Sized>(
    runtime: &R,
    object: &R::Ref,
) -> BridgeResult<Options> {
    let debug = runtime.call_bool_method(object, IS_DEBUG)?;
    let max_breadcrumbs = runtime.call_int_method(object, GET_MAX_BREADCRUMBS)?;

    // Sign-extending conversion: negative capacities wrap to effectively
    // unbounded history.
    let mut options = Options::new()
        .auto_session_tracking(false)
        .debug(debug)
        .max_breadcrumbs(max_breadcrumbs as usize);

    let outbox = call_string_accessor(runtime, object, GET_OUTBOX_PATH)
        .ok_or_else(|| BridgeError::missing("outbox path"))?;
    let database_path = derive_database_path(outbox.as_str()?);
    options = options
        .transport(outbox_transport(outbox))
        .database_path(database_path);

    let dsn = call_string_accessor(runtime, object, GET_DSN)
        .ok_or_else(|| BridgeError::missing("dsn"))?;
    options = options.dsn(dsn.into_string()?);

    if let Some(release) = optional_string(runtime, object, GET_RELEASE) {
        options = options.release(release);
    }
    if let Some(environment) = optional_string(runtime, object, GET_ENVIRONMENT) {
        options = options.environment(environment);
    }
    if let Some(dist) = optional_string(runtime, object, GET_DIST) {
        options = options.dist(dist);
    }

    Ok(options)
}

fn optional_string<R: ManagedRuntime + ?Sized>(
    runtime: &R,
    object: &R::Ref,
    accessor: &str,
) -> Option<String> {
    call_string_accessor(runtime, object, accessor)?
        .into_string()
        .ok()
}

/// Initializes the engine from the managed options object.
///
/// Nothing is returned. On failure the reason is logged and recorded as
/// the calling thread's last error, and the engine keeps whatever state it
/// had before the call.
pub fn init_native<R: ManagedRuntime + ?Sized>(runtime: &R, object: &R::Ref) {
    clear_last_error();

    let result = build_options(runtime, object).and_then(|options| {
        debug!(database_path = %options.database_path.display(), "starting native engine");
        ndk_engine::init(options).map_err(BridgeError::from)
    });

    if let Err(error) = result {
        warn!(%error, "native engine initialization aborted");
        set_last_error(error.to_string());
    }
}

/// Shuts the engine down.
pub fn shutdown() {
    ndk_engine::close();
}
