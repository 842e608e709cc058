//! Property-based test generators using proptest.

use ndk_engine::Value;
use proptest::prelude::*;

/// Strategy for arbitrary managed string contents, multi-byte text included.
pub fn managed_text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[a-zA-Z0-9_./-]{0,64}").expect("Invalid regex"),
        any::<String>(),
    ]
}

/// Strategy for tag and extra keys.
pub fn scope_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_.]{0,31}").expect("Invalid regex")
}

/// Strategy for breadcrumb levels as the managed SDK names them.
pub fn breadcrumb_level_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["debug", "info", "warning", "error", "fatal"])
        .prop_map(str::to_string)
}

/// Strategy for module records; some fields may be missing.
pub fn module_record_strategy() -> impl Strategy<Value = Value> {
    (
        prop::option::of(any::<u32>()),
        prop::option::of(any::<i32>()),
        prop::option::of(
            prop::string::string_regex("/[a-z]{1,8}/lib[a-z]{1,8}\\.so").expect("Invalid regex"),
        ),
        prop::option::of(Just("elf")),
        prop::option::of(
            prop::string::string_regex("[0-9a-f]{8}(-[0-9a-f]{4}){3}-[0-9a-f]{12}")
                .expect("Invalid regex"),
        ),
        prop::option::of(prop::string::string_regex("[0-9a-f]{40}").expect("Invalid regex")),
    )
        .prop_map(|(addr, size, code_file, kind, debug_id, code_id)| {
            let mut image = Value::new_object();
            if let Some(addr) = addr {
                image.set_by_key("image_addr", Value::new_string(format!("0x{addr:x}")));
            }
            if let Some(size) = size {
                image.set_by_key("image_size", Value::new_int32(size));
            }
            if let Some(code_file) = code_file {
                image.set_by_key("code_file", Value::new_string(code_file));
            }
            if let Some(kind) = kind {
                image.set_by_key("type", Value::new_string(kind));
            }
            if let Some(debug_id) = debug_id {
                image.set_by_key("debug_id", Value::new_string(debug_id));
            }
            if let Some(code_id) = code_id {
                image.set_by_key("code_id", Value::new_string(code_id));
            }
            image
        })
}

/// Strategy for module lists with occasional null entries.
pub fn module_list_strategy() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(
        prop_oneof![
            4 => module_record_strategy(),
            1 => Just(Value::Null),
        ],
        0..16,
    )
}
