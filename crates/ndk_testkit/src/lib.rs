//! # NDK Testkit
//!
//! Test utilities for the NDK bridge.
//!
//! This crate provides:
//! - [`HeapRuntime`], an in-memory managed runtime that tracks local references
//! - [`EngineSandbox`], exclusive access to the process-wide engine
//! - Fixtures for managed options objects and module lists
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ndk_testkit::prelude::*;
//!
//! #[test]
//! fn tag_reaches_scope() {
//!     let _sandbox = EngineSandbox::new();
//!     let rt = HeapRuntime::new();
//!     let (key, value) = (rt.string("k"), rt.string("v"));
//!     ndk_bridge::scope::set_tag(&rt, Some(&key), Some(&value));
//!     assert_eq!(rt.live_locals(), 0);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod runtime;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::runtime::*;
}

pub use fixtures::*;
pub use generators::*;
pub use runtime::*;
