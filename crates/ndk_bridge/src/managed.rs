//! The managed runtime seam.
//!
//! The bridge never talks to a managed virtual machine directly. Everything
//! it needs from the managed side goes through [`ManagedRuntime`]: reading
//! managed strings, creating new ones, calling accessors and setters,
//! building object arrays and releasing local references.
//!
//! Every reference the bridge obtains is wrapped in a [`Local`] so it is
//! released on every exit path, including early returns.

use std::mem::ManuallyDrop;
use thiserror::Error;

/// A call into the managed runtime raised an exception.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("managed exception: {message}")]
pub struct ManagedError {
    /// Description of the exception.
    pub message: String,
}

impl ManagedError {
    /// Creates a managed error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Argument of a single-argument setter call.
#[derive(Debug)]
pub enum Arg<'a, T> {
    /// An object reference, or null.
    Object(Option<&'a T>),
    /// A 64-bit integer.
    Long(i64),
}

/// Operations the bridge needs from a managed runtime.
///
/// `Ref` is a local reference: it stays valid until it is passed to
/// [`ManagedRuntime::delete_local_ref`], which must happen exactly once.
pub trait ManagedRuntime {
    /// A local reference to a managed object (strings and arrays included).
    type Ref;

    /// Length in bytes of the runtime's encoded form of `string`, without
    /// a terminator.
    fn string_utf_length(&self, string: &Self::Ref) -> usize;

    /// Writes the encoded form of `string` into `out`, which is exactly
    /// [`ManagedRuntime::string_utf_length`] bytes long.
    fn string_utf_region(&self, string: &Self::Ref, out: &mut [u8]) -> Result<(), ManagedError>;

    /// Creates a managed string from UTF-8 text.
    fn new_string_utf(&self, value: &str) -> Option<Self::Ref>;

    /// Calls a zero-argument method returning a string. `Ok(None)` is a
    /// null return.
    fn call_string_method(
        &self,
        object: &Self::Ref,
        method: &str,
    ) -> Result<Option<Self::Ref>, ManagedError>;

    /// Calls a zero-argument method returning a boolean.
    fn call_bool_method(&self, object: &Self::Ref, method: &str) -> Result<bool, ManagedError>;

    /// Calls a zero-argument method returning a 32-bit integer.
    fn call_int_method(&self, object: &Self::Ref, method: &str) -> Result<i32, ManagedError>;

    /// Calls a single-argument method returning nothing.
    fn call_void_method(
        &self,
        object: &Self::Ref,
        method: &str,
        arg: Arg<'_, Self::Ref>,
    ) -> Result<(), ManagedError>;

    /// Instantiates `class` with its no-argument constructor.
    fn new_object(&self, class: &str) -> Option<Self::Ref>;

    /// Creates an array of `len` null slots typed as `class`.
    fn new_object_array(&self, class: &str, len: usize) -> Option<Self::Ref>;

    /// Stores `element` at `index` of `array`.
    fn set_object_array_element(
        &self,
        array: &Self::Ref,
        index: usize,
        element: &Self::Ref,
    ) -> Result<(), ManagedError>;

    /// Releases a local reference.
    fn delete_local_ref(&self, reference: Self::Ref);
}

/// A local reference released when dropped.
pub struct Local<'rt, R: ManagedRuntime + ?Sized> {
    runtime: &'rt R,
    reference: ManuallyDrop<R::Ref>,
}

impl<'rt, R: ManagedRuntime + ?Sized> Local<'rt, R> {
    /// Takes ownership of `reference`.
    pub fn new(runtime: &'rt R, reference: R::Ref) -> Self {
        Self {
            runtime,
            reference: ManuallyDrop::new(reference),
        }
    }

    /// Wraps an optional reference, as returned by most runtime calls.
    pub fn from_option(runtime: &'rt R, reference: Option<R::Ref>) -> Option<Self> {
        reference.map(|reference| Self::new(runtime, reference))
    }

    /// Borrows the reference.
    pub fn get(&self) -> &R::Ref {
        &self.reference
    }

    /// Gives up ownership without releasing; the caller now owns the
    /// reference.
    #[allow(unsafe_code)]
    pub fn into_inner(self) -> R::Ref {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the reference is taken once
        // and never touched again.
        unsafe { ManuallyDrop::take(&mut this.reference) }
    }
}

impl<R: ManagedRuntime + ?Sized> Drop for Local<'_, R> {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // SAFETY: the field is not used after this point and `into_inner`
        // skips this destructor.
        let reference = unsafe { ManuallyDrop::take(&mut self.reference) };
        self.runtime.delete_local_ref(reference);
    }
}
