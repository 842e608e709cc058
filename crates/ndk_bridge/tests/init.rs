//! Engine startup from managed options.

use ndk_bridge::options::{GET_MAX_BREADCRUMBS, IS_DEBUG};
use ndk_bridge::{init_native, last_error, shutdown};
use ndk_testkit::prelude::*;

#[test]
fn init_wires_outbox_transport() {
    let sandbox = EngineSandbox::new();
    let outbox = sandbox.outbox("outbox");
    let rt = HeapRuntime::new();
    let options = rt.options(
        SdkOptions::new(outbox.to_str().unwrap())
            .dsn(TEST_DSN)
            .release("app@1.0.0")
            .environment("staging")
            .dist("42")
            .max_breadcrumbs(7),
    );

    init_native(&rt, &options);
    assert!(last_error().is_none());
    assert!(ndk_engine::is_initialized());
    assert_eq!(rt.live_locals(), 0);

    let configured = ndk_engine::with_options(|options| {
        (
            options.dsn.clone(),
            options.release.clone(),
            options.environment.clone(),
            options.dist.clone(),
            options.max_breadcrumbs,
            options.auto_session_tracking,
        )
    })
    .unwrap();
    assert_eq!(
        configured,
        (
            Some(TEST_DSN.to_string()),
            Some("app@1.0.0".to_string()),
            Some("staging".to_string()),
            Some("42".to_string()),
            7,
            false,
        )
    );

    assert!(capture_message("hello"));
    let envelopes = read_outbox(&outbox);
    assert_eq!(envelopes.len(), 1);
    let event = envelopes[0].items()[0].payload_value().unwrap();
    assert_eq!(event.get_by_key("message").as_str(), Some("hello"));
    assert_eq!(event.get_by_key("release").as_str(), Some("app@1.0.0"));

    shutdown();
    assert!(!ndk_engine::is_initialized());
}

#[test]
fn database_directory_sits_next_to_outbox() {
    let sandbox = EngineSandbox::new();
    let outbox = sandbox.outbox("outbox");
    let rt = HeapRuntime::new();
    let options = rt.options(SdkOptions::new(outbox.to_str().unwrap()).dsn(TEST_DSN));

    init_native(&rt, &options);

    let expected = sandbox.path().join(".sentry-native");
    assert!(expected.is_dir());
    let configured = ndk_engine::with_options(|options| options.database_path.clone()).unwrap();
    assert_eq!(configured, expected);
}

#[test]
fn missing_dsn_aborts_without_engine() {
    let sandbox = EngineSandbox::new();
    let outbox = sandbox.outbox("outbox");
    let rt = HeapRuntime::new();
    let options = rt.options(SdkOptions::new(outbox.to_str().unwrap()));

    init_native(&rt, &options);

    assert!(!ndk_engine::is_initialized());
    assert_eq!(last_error().as_deref(), Some("missing required value: dsn"));
    assert_eq!(rt.live_locals(), 0);
    assert!(!sandbox.path().join(".sentry-native").exists());
}

#[test]
fn missing_outbox_aborts() {
    let _sandbox = EngineSandbox::new();
    let rt = HeapRuntime::new();
    let options = rt.options(SdkOptions::default().dsn(TEST_DSN));

    init_native(&rt, &options);

    assert!(!ndk_engine::is_initialized());
    assert_eq!(
        last_error().as_deref(),
        Some("missing required value: outbox path")
    );
}

#[test]
fn raising_accessor_aborts() {
    let sandbox = EngineSandbox::new();
    let outbox = sandbox.outbox("outbox");
    let rt = HeapRuntime::new();
    let options = rt.options(SdkOptions::new(outbox.to_str().unwrap()).dsn(TEST_DSN));

    rt.fail_method(IS_DEBUG);
    init_native(&rt, &options);

    assert!(!ndk_engine::is_initialized());
    assert!(last_error().unwrap().starts_with("managed exception"));
}

#[test]
fn failed_init_keeps_running_engine() {
    let sandbox = EngineSandbox::new();
    let first = sandbox.outbox("first");
    let rt = HeapRuntime::new();

    let good = rt.options(SdkOptions::new(first.to_str().unwrap()).dsn(TEST_DSN));
    init_native(&rt, &good);
    assert!(ndk_engine::is_initialized());

    let bad = rt.options(SdkOptions::new(sandbox.outbox("second").to_str().unwrap()));
    init_native(&rt, &bad);
    assert!(last_error().is_some());
    assert!(ndk_engine::is_initialized());

    assert!(capture_message("still here"));
    assert_eq!(outbox_files(&first).len(), 1);
    assert!(outbox_files(&sandbox.path().join("second")).is_empty());
}

#[test]
fn later_init_writes_only_to_its_outbox() {
    let sandbox = EngineSandbox::new();
    let first = sandbox.outbox("first");
    let second = sandbox.outbox("second");
    let rt = HeapRuntime::new();

    let failing = rt.options(SdkOptions::new(first.to_str().unwrap()));
    init_native(&rt, &failing);
    assert!(!ndk_engine::is_initialized());

    let options = rt.options(SdkOptions::new(second.to_str().unwrap()).dsn(TEST_DSN));
    init_native(&rt, &options);
    assert!(last_error().is_none());

    assert!(capture_message("one"));
    assert!(capture_message("two"));
    assert!(outbox_files(&first).is_empty());
    assert_eq!(outbox_files(&second).len(), 2);
}

#[test]
fn reinit_moves_delivery_to_new_outbox() {
    let sandbox = EngineSandbox::new();
    let first = sandbox.outbox("first");
    let second = sandbox.outbox("second");
    let rt = HeapRuntime::new();

    init_native(&rt, &rt.options(SdkOptions::new(first.to_str().unwrap()).dsn(TEST_DSN)));
    assert!(capture_message("first"));

    init_native(&rt, &rt.options(SdkOptions::new(second.to_str().unwrap()).dsn(TEST_DSN)));
    assert!(capture_message("second"));

    assert_eq!(outbox_files(&first).len(), 1);
    assert_eq!(outbox_files(&second).len(), 1);
}

#[test]
fn negative_breadcrumb_capacity_wraps_to_unbounded() {
    let sandbox = EngineSandbox::new();
    let outbox = sandbox.outbox("outbox");
    let rt = HeapRuntime::new();
    let options = rt.options(
        SdkOptions::new(outbox.to_str().unwrap())
            .dsn(TEST_DSN)
            .max_breadcrumbs(-1),
    );

    init_native(&rt, &options);
    assert!(ndk_engine::is_initialized());
    assert_eq!(
        ndk_engine::with_scope(|scope| scope.max_breadcrumbs()),
        usize::MAX
    );

    let message = rt.string("kept");
    ndk_bridge::scope::add_breadcrumb(&rt, None, Some(&message), None, None, None, None);
    ndk_engine::with_scope(|scope| {
        assert_eq!(scope.breadcrumbs().len(), 1);
        assert_eq!(
            scope.breadcrumbs()[0].get_by_key("message").as_str(),
            Some("kept")
        );
    });

    rt.fail_method(GET_MAX_BREADCRUMBS);
    init_native(&rt, &options);
    assert!(last_error().is_some());
}
