//! # NDK Bridge
//!
//! Boundary layer between a managed crash-reporting SDK and the native
//! engine in [`ndk_engine`].
//!
//! This crate provides:
//! - String marshaling with exact capacity checks ([`marshal`])
//! - Scope mutators for tags, extra, user and breadcrumbs ([`scope`])
//! - All-or-nothing engine startup from managed options ([`options`])
//! - The outbox transport writing one file per envelope ([`transport`])
//! - The module list as managed `DebugImage` records ([`modules`])
//!
//! The managed side is reached only through [`ManagedRuntime`]. Bridge
//! operations never return errors to the managed caller; failures are
//! logged and the last initialization failure is kept per thread (see
//! [`last_error`]).
//!
//! ## Threading
//!
//! Every operation runs synchronously on the calling thread. The bridge
//! holds no locks of its own: the engine serializes access to its global
//! state, and the transport callback runs on the engine's worker thread
//! with only its own state.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod managed;
pub mod marshal;
pub mod modules;
pub mod options;
pub mod scope;
pub mod transport;

pub use error::{clear_last_error, last_error, set_last_error, BridgeError, BridgeResult};
pub use managed::{Arg, Local, ManagedError, ManagedRuntime};
pub use marshal::OwnedBuffer;
pub use modules::DebugImage;
pub use options::{init_native, shutdown};
pub use transport::MAX_ENVELOPE_PATH;

/// Bridge version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
