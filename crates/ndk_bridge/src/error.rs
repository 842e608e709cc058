//! Error types and the last-error channel.
//!
//! No bridge operation returns an error to the managed caller. Failures are
//! logged, and the most recent initialization failure on the current
//! thread is kept for callers that want to know why nothing happened.

use crate::managed::ManagedError;
use ndk_engine::EngineError;
use std::cell::RefCell;
use thiserror::Error;

/// Result type for bridge internals.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur inside the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A required value could not be obtained from the managed side.
    #[error("missing required value: {field}")]
    MissingRequired {
        /// Name of the field.
        field: &'static str,
    },

    /// A string's encoded form is not valid UTF-8.
    #[error("invalid string encoding")]
    InvalidEncoding,

    /// A destination path exceeds the fixed path limit.
    #[error("path too long: {len} bytes, limit {max}")]
    PathTooLong {
        /// Path length including the terminator.
        len: usize,
        /// The limit.
        max: usize,
    },

    /// The managed runtime could not allocate an object.
    #[error("managed allocation failed: {class}")]
    AllocationFailed {
        /// Class that was being allocated.
        class: &'static str,
    },

    /// The managed runtime raised an exception.
    #[error(transparent)]
    Managed(#[from] ManagedError),

    /// The engine rejected an operation.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl BridgeError {
    /// Creates a missing required value error.
    pub fn missing(field: &'static str) -> Self {
        Self::MissingRequired { field }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Sets the last error message.
pub fn set_last_error(message: impl Into<String>) {
    let msg = message.into();
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(msg);
    });
}

/// Clears the last error.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Returns the last error message recorded on this thread.
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|e| e.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_error_is_thread_local() {
        clear_last_error();
        assert!(last_error().is_none());

        set_last_error("test error");
        assert_eq!(last_error().as_deref(), Some("test error"));
        let other = std::thread::spawn(last_error).join().unwrap();
        assert!(other.is_none());

        clear_last_error();
        assert!(last_error().is_none());
    }

    #[test]
    fn messages() {
        assert_eq!(
            BridgeError::missing("dsn").to_string(),
            "missing required value: dsn"
        );
        assert_eq!(
            BridgeError::PathTooLong { len: 5000, max: 4096 }.to_string(),
            "path too long: 5000 bytes, limit 4096"
        );
        let managed: BridgeError = ManagedError::new("NullPointerException").into();
        assert_eq!(managed.to_string(), "managed exception: NullPointerException");
    }
}
