//! Loaded module list as managed `DebugImage` records.

use crate::error::BridgeError;
use crate::managed::{Arg, Local, ManagedRuntime};
use crate::marshal::to_managed;
use ndk_engine::{Value, ValueKind};
use tracing::{debug, warn};

/// Managed class of the produced records.
pub const DEBUG_IMAGE_CLASS: &str = "io/sentry/protocol/DebugImage";

/// Setter for the image load address.
pub const SET_IMAGE_ADDR: &str = "setImageAddr";
/// Setter for the image size.
pub const SET_IMAGE_SIZE: &str = "setImageSize";
/// Setter for the code file path.
pub const SET_CODE_FILE: &str = "setCodeFile";
/// Setter for the image type.
pub const SET_TYPE: &str = "setType";
/// Setter for the debug identifier.
pub const SET_DEBUG_ID: &str = "setDebugId";
/// Setter for the code identifier.
pub const SET_CODE_ID: &str = "setCodeId";
/// Setter for the debug file path.
pub const SET_DEBUG_FILE: &str = "setDebugFile";

/// Native view of a managed `DebugImage` record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugImage {
    /// Load address, hex formatted.
    pub image_addr: Option<String>,
    /// Size of the mapped image in bytes.
    pub image_size: Option<i64>,
    /// Path of the binary.
    pub code_file: Option<String>,
    /// Image format, e.g. `elf`.
    pub image_type: Option<String>,
    /// Debug identifier.
    pub debug_id: Option<String>,
    /// Code identifier, e.g. the hex build id.
    pub code_id: Option<String>,
    /// Path of the debug companion file.
    pub debug_file: Option<String>,
}

/// Drops the engine's cached module list.
pub fn clear() {
    ndk_engine::clear_modulecache();
}

/// Converts the engine's module list into a managed `DebugImage[]`.
///
/// Returns `None` when the engine has no list or the array cannot be
/// created. Null entries leave their slot empty.
pub fn load<R: ManagedRuntime + ?Sized>(runtime: &R) -> Option<R::Ref> {
    let images = ndk_engine::get_modules_list();
    if images.kind() != ValueKind::List {
        debug!(kind = ?images.kind(), "module list unavailable");
        return None;
    }

    let Some(array) = Local::from_option(
        runtime,
        runtime.new_object_array(DEBUG_IMAGE_CLASS, images.len()),
    ) else {
        let error = BridgeError::AllocationFailed {
            class: DEBUG_IMAGE_CLASS,
        };
        warn!(%error, "module list dropped");
        return None;
    };

    for (index, image) in images.items().enumerate() {
        if image.is_null() {
            continue;
        }
        let Some(record) = Local::from_option(runtime, runtime.new_object(DEBUG_IMAGE_CLASS))
        else {
            warn!(index, "failed to allocate debug image");
            continue;
        };

        fill_record(runtime, record.get(), image);

        if let Err(error) = runtime.set_object_array_element(array.get(), index, record.get()) {
            warn!(index, %error, "failed to store debug image");
        }
    }
    drop(images);

    Some(array.into_inner())
}

fn fill_record<R: ManagedRuntime + ?Sized>(runtime: &R, record: &R::Ref, image: &Value) {
    set_string(runtime, record, SET_IMAGE_ADDR, image.get_by_key("image_addr"));

    let image_size = image.get_by_key("image_size");
    if !image_size.is_null() {
        let size = i64::from(image_size.as_i32());
        call_setter(runtime, record, SET_IMAGE_SIZE, Arg::Long(size));
    }

    set_string(runtime, record, SET_CODE_FILE, image.get_by_key("code_file"));

    let image_type = image.get_by_key("type");
    set_string(runtime, record, SET_TYPE, image_type);

    // debug_id follows the presence of type, not of debug_id itself
    if !image_type.is_null() {
        let debug_id = image.get_by_key("debug_id");
        set_text(runtime, record, SET_DEBUG_ID, debug_id.as_string());
    }

    set_string(runtime, record, SET_CODE_ID, image.get_by_key("code_id"));
    set_string(runtime, record, SET_DEBUG_FILE, image.get_by_key("debug_file"));
}

fn set_string<R: ManagedRuntime + ?Sized>(
    runtime: &R,
    record: &R::Ref,
    setter: &str,
    value: &Value,
) {
    if !value.is_null() {
        set_text(runtime, record, setter, value.as_string());
    }
}

fn set_text<R: ManagedRuntime + ?Sized>(runtime: &R, record: &R::Ref, setter: &str, text: &str) {
    let string = to_managed(runtime, text);
    call_setter(
        runtime,
        record,
        setter,
        Arg::Object(string.as_ref().map(Local::get)),
    );
}

fn call_setter<R: ManagedRuntime + ?Sized>(
    runtime: &R,
    record: &R::Ref,
    setter: &str,
    arg: Arg<'_, R::Ref>,
) {
    if let Err(error) = runtime.call_void_method(record, setter, arg) {
        debug!(setter, %error, "debug image setter raised");
    }
}
