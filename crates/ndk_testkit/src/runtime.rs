//! In-memory managed runtime.
//!
//! [`HeapRuntime`] implements [`ManagedRuntime`] over a small object heap
//! holding strings, options objects, `DebugImage` records and object
//! arrays. Every reference it hands to the bridge is recorded as a live
//! local reference, so tests can assert that the bridge released all of
//! them. References created by the test itself (arguments) are not locals
//! and must never be released by the bridge.
//!
//! The encoded string form is plain UTF-8.

use ndk_bridge::modules::{
    DEBUG_IMAGE_CLASS, SET_CODE_FILE, SET_CODE_ID, SET_DEBUG_FILE, SET_DEBUG_ID, SET_IMAGE_ADDR,
    SET_IMAGE_SIZE, SET_TYPE,
};
use ndk_bridge::options::{
    GET_DIST, GET_DSN, GET_ENVIRONMENT, GET_MAX_BREADCRUMBS, GET_OUTBOX_PATH, GET_RELEASE,
    IS_DEBUG,
};
use ndk_bridge::{Arg, DebugImage, ManagedError, ManagedRuntime};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::fixtures::SdkOptions;

/// Handle to an object on the [`HeapRuntime`] heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapRef(u64);

#[derive(Debug, Clone)]
enum Object {
    String(String),
    Options(SdkOptions),
    Image(DebugImage),
    Array {
        class: String,
        slots: Vec<Option<HeapRef>>,
    },
}

#[derive(Debug, Default)]
struct Heap {
    next: u64,
    objects: HashMap<HeapRef, Object>,
    locals: HashSet<HeapRef>,
    failing_methods: HashSet<String>,
    failing_classes: HashSet<String>,
    corrupt: HashSet<HeapRef>,
    allocated: HashMap<String, usize>,
}

impl Heap {
    fn insert(&mut self, object: Object) -> HeapRef {
        self.next += 1;
        let reference = HeapRef(self.next);
        self.objects.insert(reference, object);
        reference
    }

    fn insert_local(&mut self, object: Object) -> HeapRef {
        let reference = self.insert(object);
        self.locals.insert(reference);
        reference
    }

    fn check_method(&self, method: &str) -> Result<(), ManagedError> {
        if self.failing_methods.contains(method) {
            return Err(ManagedError::new(format!("RuntimeException in {method}")));
        }
        Ok(())
    }

    fn options(&self, object: HeapRef) -> Result<&SdkOptions, ManagedError> {
        match self.objects.get(&object) {
            Some(Object::Options(options)) => Ok(options),
            _ => Err(ManagedError::new("NoSuchMethodError")),
        }
    }

    fn string(&self, reference: HeapRef) -> Option<&str> {
        match self.objects.get(&reference) {
            Some(Object::String(value)) => Some(value),
            _ => None,
        }
    }
}

/// An in-memory managed runtime for tests.
#[derive(Debug, Default)]
pub struct HeapRuntime {
    heap: RefCell<Heap>,
}

impl HeapRuntime {
    /// Creates an empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a string owned by the test.
    pub fn string(&self, value: &str) -> HeapRef {
        self.heap
            .borrow_mut()
            .insert(Object::String(value.to_string()))
    }

    /// Creates a managed options object owned by the test.
    pub fn options(&self, options: SdkOptions) -> HeapRef {
        self.heap.borrow_mut().insert(Object::Options(options))
    }

    /// Makes every call of `method` raise an exception.
    pub fn fail_method(&self, method: &str) {
        self.heap
            .borrow_mut()
            .failing_methods
            .insert(method.to_string());
    }

    /// Makes every allocation of `class` fail.
    pub fn fail_allocation(&self, class: &str) {
        self.heap
            .borrow_mut()
            .failing_classes
            .insert(class.to_string());
    }

    /// Makes conversion of `string` to its encoded form fail.
    pub fn corrupt_string(&self, string: HeapRef) {
        self.heap.borrow_mut().corrupt.insert(string);
    }

    /// Number of local references handed out and not yet released.
    pub fn live_locals(&self) -> usize {
        self.heap.borrow().locals.len()
    }

    /// Number of objects of `class` allocated through `new_object`.
    pub fn allocated(&self, class: &str) -> usize {
        self.heap
            .borrow()
            .allocated
            .get(class)
            .copied()
            .unwrap_or(0)
    }

    /// Reads the text of a managed string.
    pub fn text(&self, string: HeapRef) -> Option<String> {
        self.heap.borrow().string(string).map(str::to_string)
    }

    /// Returns the class and length of an object array.
    pub fn array_info(&self, array: HeapRef) -> Option<(String, usize)> {
        match self.heap.borrow().objects.get(&array) {
            Some(Object::Array { class, slots }) => Some((class.clone(), slots.len())),
            _ => None,
        }
    }

    /// Returns the `DebugImage` records stored in an array, slot by slot.
    pub fn image_slots(&self, array: HeapRef) -> Vec<Option<DebugImage>> {
        let heap = self.heap.borrow();
        let Some(Object::Array { slots, .. }) = heap.objects.get(&array) else {
            panic!("{array:?} is not an array");
        };
        slots
            .iter()
            .map(|slot| match slot.and_then(|r| heap.objects.get(&r)) {
                Some(Object::Image(image)) => Some(image.clone()),
                Some(other) => panic!("unexpected array element {other:?}"),
                None => None,
            })
            .collect()
    }
}

impl ManagedRuntime for HeapRuntime {
    type Ref = HeapRef;

    fn string_utf_length(&self, string: &HeapRef) -> usize {
        self.heap.borrow().string(*string).map_or(0, str::len)
    }

    fn string_utf_region(&self, string: &HeapRef, out: &mut [u8]) -> Result<(), ManagedError> {
        let heap = self.heap.borrow();
        if heap.corrupt.contains(string) {
            return Err(ManagedError::new("StringIndexOutOfBoundsException"));
        }
        let value = heap
            .string(*string)
            .ok_or_else(|| ManagedError::new("ClassCastException"))?;
        if value.len() != out.len() {
            return Err(ManagedError::new("StringIndexOutOfBoundsException"));
        }
        out.copy_from_slice(value.as_bytes());
        Ok(())
    }

    fn new_string_utf(&self, value: &str) -> Option<HeapRef> {
        Some(
            self.heap
                .borrow_mut()
                .insert_local(Object::String(value.to_string())),
        )
    }

    fn call_string_method(
        &self,
        object: &HeapRef,
        method: &str,
    ) -> Result<Option<HeapRef>, ManagedError> {
        let mut heap = self.heap.borrow_mut();
        heap.check_method(method)?;
        let options = heap.options(*object)?;
        let value = match method {
            GET_OUTBOX_PATH => options.outbox_path.clone(),
            GET_DSN => options.dsn.clone(),
            GET_RELEASE => options.release.clone(),
            GET_ENVIRONMENT => options.environment.clone(),
            GET_DIST => options.dist.clone(),
            _ => return Err(ManagedError::new(format!("NoSuchMethodError: {method}"))),
        };
        Ok(value.map(|value| heap.insert_local(Object::String(value))))
    }

    fn call_bool_method(&self, object: &HeapRef, method: &str) -> Result<bool, ManagedError> {
        let heap = self.heap.borrow();
        heap.check_method(method)?;
        let options = heap.options(*object)?;
        match method {
            IS_DEBUG => Ok(options.debug),
            _ => Err(ManagedError::new(format!("NoSuchMethodError: {method}"))),
        }
    }

    fn call_int_method(&self, object: &HeapRef, method: &str) -> Result<i32, ManagedError> {
        let heap = self.heap.borrow();
        heap.check_method(method)?;
        let options = heap.options(*object)?;
        match method {
            GET_MAX_BREADCRUMBS => Ok(options.max_breadcrumbs),
            _ => Err(ManagedError::new(format!("NoSuchMethodError: {method}"))),
        }
    }

    fn call_void_method(
        &self,
        object: &HeapRef,
        method: &str,
        arg: Arg<'_, HeapRef>,
    ) -> Result<(), ManagedError> {
        let mut heap = self.heap.borrow_mut();
        heap.check_method(method)?;

        let text = match &arg {
            Arg::Object(Some(string)) => Some(
                heap.string(**string)
                    .ok_or_else(|| ManagedError::new("ClassCastException"))?
                    .to_string(),
            ),
            _ => None,
        };

        let Some(Object::Image(image)) = heap.objects.get_mut(object) else {
            return Err(ManagedError::new(format!("NoSuchMethodError: {method}")));
        };
        match (method, arg) {
            (SET_IMAGE_SIZE, Arg::Long(size)) => image.image_size = Some(size),
            (SET_IMAGE_ADDR, Arg::Object(_)) => image.image_addr = text,
            (SET_CODE_FILE, Arg::Object(_)) => image.code_file = text,
            (SET_TYPE, Arg::Object(_)) => image.image_type = text,
            (SET_DEBUG_ID, Arg::Object(_)) => image.debug_id = text,
            (SET_CODE_ID, Arg::Object(_)) => image.code_id = text,
            (SET_DEBUG_FILE, Arg::Object(_)) => image.debug_file = text,
            _ => return Err(ManagedError::new(format!("NoSuchMethodError: {method}"))),
        }
        Ok(())
    }

    fn new_object(&self, class: &str) -> Option<HeapRef> {
        let mut heap = self.heap.borrow_mut();
        if heap.failing_classes.contains(class) || class != DEBUG_IMAGE_CLASS {
            return None;
        }
        *heap.allocated.entry(class.to_string()).or_default() += 1;
        Some(heap.insert_local(Object::Image(DebugImage::default())))
    }

    fn new_object_array(&self, class: &str, len: usize) -> Option<HeapRef> {
        let mut heap = self.heap.borrow_mut();
        if heap.failing_classes.contains(class) {
            return None;
        }
        Some(heap.insert_local(Object::Array {
            class: class.to_string(),
            slots: vec![None; len],
        }))
    }

    fn set_object_array_element(
        &self,
        array: &HeapRef,
        index: usize,
        element: &HeapRef,
    ) -> Result<(), ManagedError> {
        let mut heap = self.heap.borrow_mut();
        let Some(Object::Array { slots, .. }) = heap.objects.get_mut(array) else {
            return Err(ManagedError::new("ArrayStoreException"));
        };
        let slot = slots
            .get_mut(index)
            .ok_or_else(|| ManagedError::new("ArrayIndexOutOfBoundsException"))?;
        *slot = Some(*element);
        Ok(())
    }

    fn delete_local_ref(&self, reference: HeapRef) {
        let released = self.heap.borrow_mut().locals.remove(&reference);
        assert!(released, "{reference:?} is not a live local reference");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locals_are_tracked() {
        let rt = HeapRuntime::new();
        let argument = rt.string("arg");
        assert_eq!(rt.live_locals(), 0);

        let local = rt.new_string_utf("x").unwrap();
        assert_eq!(rt.live_locals(), 1);
        rt.delete_local_ref(local);
        assert_eq!(rt.live_locals(), 0);
        assert_eq!(rt.text(argument).as_deref(), Some("arg"));
    }

    #[test]
    #[should_panic(expected = "is not a live local reference")]
    fn double_release_panics() {
        let rt = HeapRuntime::new();
        let local = rt.new_string_utf("x").unwrap();
        rt.delete_local_ref(local);
        rt.delete_local_ref(local);
    }

    #[test]
    #[should_panic(expected = "is not a live local reference")]
    fn releasing_an_argument_panics() {
        let rt = HeapRuntime::new();
        let argument = rt.string("arg");
        rt.delete_local_ref(argument);
    }

    #[test]
    fn options_accessors() {
        let rt = HeapRuntime::new();
        let options = rt.options(SdkOptions::new("/tmp/outbox").dsn("https://k@host/1"));

        let outbox = rt
            .call_string_method(&options, GET_OUTBOX_PATH)
            .unwrap()
            .unwrap();
        assert_eq!(rt.text(outbox).as_deref(), Some("/tmp/outbox"));
        assert!(rt.call_string_method(&options, GET_RELEASE).unwrap().is_none());
        assert!(rt.call_string_method(&options, "getOther").is_err());

        rt.fail_method(IS_DEBUG);
        assert!(rt.call_bool_method(&options, IS_DEBUG).is_err());
    }

    #[test]
    fn image_setters() {
        let rt = HeapRuntime::new();
        let array = rt.new_object_array(DEBUG_IMAGE_CLASS, 2).unwrap();
        let image = rt.new_object(DEBUG_IMAGE_CLASS).unwrap();
        let addr = rt.string("0x1000");

        rt.call_void_method(&image, SET_IMAGE_ADDR, Arg::Object(Some(&addr)))
            .unwrap();
        rt.call_void_method(&image, SET_IMAGE_SIZE, Arg::Long(4096))
            .unwrap();
        rt.set_object_array_element(&array, 1, &image).unwrap();
        assert!(rt.set_object_array_element(&array, 2, &image).is_err());

        let slots = rt.image_slots(array);
        assert_eq!(slots[0], None);
        let stored = slots[1].clone().unwrap();
        assert_eq!(stored.image_addr.as_deref(), Some("0x1000"));
        assert_eq!(stored.image_size, Some(4096));
        assert_eq!(rt.allocated(DEBUG_IMAGE_CLASS), 1);
    }
}
