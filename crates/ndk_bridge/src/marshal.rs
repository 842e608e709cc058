//! String marshaling between the managed runtime and native buffers.

use crate::error::{BridgeError, BridgeResult};
use crate::managed::{Local, ManagedRuntime};
use std::fmt;
use tracing::debug;

/// A heap buffer holding an encoded string and its null terminator.
///
/// The buffer has exactly one owner and is released when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct OwnedBuffer {
    bytes: Box<[u8]>,
}

impl OwnedBuffer {
    /// Encoded bytes without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.bytes.len() - 1]
    }

    /// Encoded bytes including the terminator.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes
    }

    /// Total size, terminator included.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// The contents as text.
    pub fn as_str(&self) -> BridgeResult<&str> {
        std::str::from_utf8(self.as_bytes()).map_err(|_| BridgeError::InvalidEncoding)
    }

    /// Consumes the buffer into owned text.
    pub fn into_string(self) -> BridgeResult<String> {
        self.as_str().map(str::to_string)
    }

    /// Releases the buffer.
    pub fn release(self) {}
}

impl From<&str> for OwnedBuffer {
    fn from(value: &str) -> Self {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }
}

impl fmt::Debug for OwnedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedBuffer")
            .field(&String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

/// Copies the encoded form of `source` plus a terminator into `buffer`.
///
/// Fails, leaving `buffer` untouched, if the encoded length plus one does
/// not fit or the runtime reports a conversion error.
pub fn copy_into<R: ManagedRuntime + ?Sized>(
    runtime: &R,
    source: &R::Ref,
    buffer: &mut [u8],
) -> bool {
    let len = runtime.string_utf_length(source);
    if len >= buffer.len() {
        return false;
    }

    let mut staged = vec![0u8; len];
    if let Err(error) = runtime.string_utf_region(source, &mut staged) {
        debug!(%error, "string conversion failed");
        return false;
    }

    buffer[..len].copy_from_slice(&staged);
    buffer[len] = 0;
    true
}

/// Copies `source` into a new buffer sized to its encoded length plus one.
pub fn to_owned<R: ManagedRuntime + ?Sized>(runtime: &R, source: &R::Ref) -> Option<OwnedBuffer> {
    let len = runtime.string_utf_length(source);
    let mut bytes = vec![0u8; len.checked_add(1)?].into_boxed_slice();
    if !copy_into(runtime, source, &mut bytes) {
        return None;
    }
    Some(OwnedBuffer { bytes })
}

/// Like [`to_owned`], treating a null reference as no value.
pub fn to_owned_opt<R: ManagedRuntime + ?Sized>(
    runtime: &R,
    source: Option<&R::Ref>,
) -> Option<OwnedBuffer> {
    to_owned(runtime, source?)
}

/// Resolves an optional managed string to owned text.
///
/// Null references, conversion failures and invalid encodings all yield
/// `None`.
pub fn to_string_opt<R: ManagedRuntime + ?Sized>(
    runtime: &R,
    source: Option<&R::Ref>,
) -> Option<String> {
    to_owned_opt(runtime, source)?.into_string().ok()
}

/// Calls a zero-argument string accessor on `object` and copies the result.
///
/// A null result or a failed call is no value. The intermediate managed
/// string is released on every path.
pub fn call_string_accessor<R: ManagedRuntime + ?Sized>(
    runtime: &R,
    object: &R::Ref,
    accessor: &str,
) -> Option<OwnedBuffer> {
    let result = match runtime.call_string_method(object, accessor) {
        Ok(result) => result,
        Err(error) => {
            debug!(accessor, %error, "string accessor raised");
            return None;
        }
    };
    let string = Local::from_option(runtime, result)?;
    to_owned(runtime, string.get())
}

/// Creates a managed string holding `value`.
pub fn to_managed<'rt, R: ManagedRuntime + ?Sized>(
    runtime: &'rt R,
    value: &str,
) -> Option<Local<'rt, R>> {
    Local::from_option(runtime, runtime.new_string_utf(value))
}
