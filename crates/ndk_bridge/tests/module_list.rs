//! Module list conversion into managed records.

use ndk_bridge::modules::{self, DEBUG_IMAGE_CLASS};
use ndk_bridge::{DebugImage, ManagedRuntime};
use ndk_engine::Value;
use ndk_testkit::prelude::*;
use proptest::prelude::*;

#[test]
fn records_carry_all_fields() {
    let sandbox = EngineSandbox::new();
    let mut image = module_record("/system/lib64/libc.so", 0x7f00_0000, 4096);
    image.set_by_key("debug_id", Value::new_string("b4d8b5e5-0000-0000-0000-000000000000"));
    image.set_by_key("code_id", Value::new_string("e5b5d8b4"));
    image.set_by_key("debug_file", Value::new_string("/symbols/libc.so"));
    sandbox.set_modules(Value::List(vec![image]));

    let rt = HeapRuntime::new();
    let array = modules::load(&rt).unwrap();
    assert_eq!(rt.array_info(array), Some((DEBUG_IMAGE_CLASS.to_string(), 1)));
    assert_eq!(
        rt.image_slots(array),
        vec![Some(DebugImage {
            image_addr: Some("0x7f000000".to_string()),
            image_size: Some(4096),
            code_file: Some("/system/lib64/libc.so".to_string()),
            image_type: Some("elf".to_string()),
            debug_id: Some("b4d8b5e5-0000-0000-0000-000000000000".to_string()),
            code_id: Some("e5b5d8b4".to_string()),
            debug_file: Some("/symbols/libc.so".to_string()),
        })]
    );

    rt.delete_local_ref(array);
    assert_eq!(rt.live_locals(), 0);
}

#[test]
fn empty_list_gives_empty_array() {
    let sandbox = EngineSandbox::new();
    sandbox.set_modules(Value::new_list());

    let rt = HeapRuntime::new();
    let array = modules::load(&rt).unwrap();
    assert_eq!(rt.array_info(array), Some((DEBUG_IMAGE_CLASS.to_string(), 0)));
    assert_eq!(rt.allocated(DEBUG_IMAGE_CLASS), 0);
}

#[test]
fn non_list_gives_nothing() {
    let sandbox = EngineSandbox::new();
    sandbox.set_modules(Value::Null);

    let rt = HeapRuntime::new();
    assert!(modules::load(&rt).is_none());
    assert_eq!(rt.live_locals(), 0);
}

#[test]
fn null_entries_leave_slots_empty() {
    let sandbox = EngineSandbox::new();
    sandbox.set_modules(Value::List(vec![
        Value::Null,
        module_record("/lib/a.so", 0x1000, 16),
        Value::Null,
    ]));

    let rt = HeapRuntime::new();
    let array = modules::load(&rt).unwrap();
    let slots = rt.image_slots(array);
    assert_eq!(slots.len(), 3);
    assert!(slots[0].is_none());
    assert_eq!(slots[1].as_ref().unwrap().code_file.as_deref(), Some("/lib/a.so"));
    assert!(slots[2].is_none());
    assert_eq!(rt.allocated(DEBUG_IMAGE_CLASS), 1);
}

#[test]
fn debug_id_follows_type() {
    let sandbox = EngineSandbox::new();
    let typed_without_id = module_record("/lib/a.so", 0x1000, 16);
    let mut id_without_type = Value::new_object();
    id_without_type.set_by_key("debug_id", Value::new_string("abc"));
    sandbox.set_modules(Value::List(vec![typed_without_id, id_without_type]));

    let rt = HeapRuntime::new();
    let array = modules::load(&rt).unwrap();
    let slots = rt.image_slots(array);
    assert_eq!(slots[0].as_ref().unwrap().debug_id.as_deref(), Some(""));
    assert_eq!(slots[1].as_ref().unwrap().debug_id, None);
    assert_eq!(slots[1].as_ref().unwrap().image_type, None);
}

#[test]
fn list_is_cached_until_cleared() {
    let sandbox = EngineSandbox::new();
    let finder =
        sandbox.shared_modules(Value::List(vec![module_record("/lib/a.so", 0x1000, 16)]));
    let rt = HeapRuntime::new();
    let first = modules::load(&rt).unwrap();
    assert_eq!(rt.array_info(first).unwrap().1, 1);
    assert_eq!(finder.calls(), 1);

    finder.set(Value::new_list());
    let cached = modules::load(&rt).unwrap();
    assert_eq!(rt.array_info(cached).unwrap().1, 1);
    assert_eq!(rt.image_slots(cached), rt.image_slots(first));
    assert_eq!(finder.calls(), 1);

    modules::clear();
    let fresh = modules::load(&rt).unwrap();
    assert_eq!(rt.array_info(fresh).unwrap().1, 0);
    assert_eq!(finder.calls(), 2);

    for array in [first, cached, fresh] {
        rt.delete_local_ref(array);
    }
    assert_eq!(rt.live_locals(), 0);
}

#[test]
fn failed_array_allocation_gives_nothing() {
    let sandbox = EngineSandbox::new();
    sandbox.set_modules(Value::List(vec![module_record("/lib/a.so", 0x1000, 16)]));

    let rt = HeapRuntime::new();
    rt.fail_allocation(DEBUG_IMAGE_CLASS);
    assert!(modules::load(&rt).is_none());
    assert_eq!(rt.live_locals(), 0);
}

proptest! {
    #[test]
    fn every_local_is_released(list in module_list_strategy()) {
        let sandbox = EngineSandbox::new();
        let nulls = list.iter().filter(|image| image.is_null()).count();
        let len = list.len();
        sandbox.set_modules(Value::List(list));

        let rt = HeapRuntime::new();
        let array = modules::load(&rt).unwrap();
        let slots = rt.image_slots(array);
        prop_assert_eq!(slots.len(), len);
        prop_assert_eq!(slots.iter().filter(|slot| slot.is_none()).count(), nulls);
        prop_assert_eq!(rt.allocated(DEBUG_IMAGE_CLASS), len - nulls);
        prop_assert_eq!(rt.live_locals(), 1);
        rt.delete_local_ref(array);
    }
}
