//! # NDK Engine
//!
//! The native crash-reporting engine as seen from the bridge.
//!
//! This crate provides:
//! - [`Value`], the structured value type events and scope data are built from
//! - The process-wide [`Scope`] (tags, extra, user, breadcrumbs)
//! - [`Options`] and the global [`init`] / [`close`] lifecycle
//! - [`Transport`], invoked from an engine-owned worker thread
//! - [`Envelope`] framing and the on-disk envelope writer
//! - The loaded module list ([`get_modules_list`], [`clear_modulecache`])
//!
//! All global state is guarded internally; callers never lock.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod error;
pub mod modules;
mod options;
mod runtime;
pub mod scope;
mod transport;
mod value;

pub use envelope::{Envelope, EnvelopeItem};
pub use error::{EngineError, EngineResult};
pub use modules::{
    clear_module_finder, clear_modulecache, get_modules_list, set_module_finder, ModuleFinder,
    ProcMapsFinder,
};
pub use options::Options;
pub use runtime::{capture_event, close, flush, init, is_initialized, with_options};
pub use scope::{
    add_breadcrumb, remove_extra, remove_tag, remove_user, set_extra, set_tag, set_user,
    with_scope, with_scope_mut, Scope, DEFAULT_MAX_BREADCRUMBS,
};
pub use transport::{FreeFunc, SendFunc, Transport, TransportState};
pub use value::{timestamp_now, Value, ValueKind};

/// Engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
