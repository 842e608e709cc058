//! String marshaling properties.

use ndk_bridge::marshal::{copy_into, to_owned, to_string_opt};
use ndk_testkit::prelude::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn round_trip_within_capacity(text in managed_text_strategy(), spare in 0usize..8) {
        let rt = HeapRuntime::new();
        let source = rt.string(&text);
        let mut buffer = vec![0xaau8; text.len() + 1 + spare];

        prop_assert!(copy_into(&rt, &source, &mut buffer));
        prop_assert_eq!(&buffer[..text.len()], text.as_bytes());
        prop_assert_eq!(buffer[text.len()], 0);
        prop_assert_eq!(to_string_opt(&rt, Some(&source)), Some(text));
    }

    #[test]
    fn fails_when_terminator_does_not_fit(text in managed_text_strategy()) {
        let rt = HeapRuntime::new();
        let source = rt.string(&text);
        let mut buffer = vec![0xaau8; text.len()];

        prop_assert!(!copy_into(&rt, &source, &mut buffer));
        prop_assert!(buffer.iter().all(|&b| b == 0xaa));
    }

    #[test]
    fn owned_buffer_is_exact(text in managed_text_strategy()) {
        let rt = HeapRuntime::new();
        let buffer = to_owned(&rt, &rt.string(&text)).unwrap();
        prop_assert_eq!(buffer.capacity(), text.len() + 1);
        prop_assert_eq!(buffer.as_str().unwrap(), text.as_str());
        prop_assert_eq!(rt.live_locals(), 0);
    }
}

#[test]
fn corrupt_string_resolves_to_nothing() {
    let rt = HeapRuntime::new();
    let source = rt.string("abc");
    rt.corrupt_string(source);
    assert!(to_owned(&rt, &source).is_none());
    assert!(to_string_opt(&rt, Some(&source)).is_none());
    assert!(to_string_opt(&rt, None).is_none());
}
