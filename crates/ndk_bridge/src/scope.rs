//! Scope mutators exposed to the managed layer.
//!
//! Each function resolves its managed string arguments and applies one
//! change to the engine's process-wide scope. None of them report failure:
//! an argument that is required for the call but null or unreadable turns
//! the call into a logged no-op. Concurrent callers are serialized by the
//! engine, not here.

use crate::managed::ManagedRuntime;
use crate::marshal::to_string_opt;
use ndk_engine::Value;
use tracing::debug;

/// Sets a tag.
pub fn set_tag<R: ManagedRuntime + ?Sized>(
    runtime: &R,
    key: Option<&R::Ref>,
    value: Option<&R::Ref>,
) {
    let (Some(key), Some(value)) = (to_string_opt(runtime, key), to_string_opt(runtime, value))
    else {
        debug!("set_tag ignored: key or value unavailable");
        return;
    };
    ndk_engine::set_tag(&key, &value);
}

/// Removes a tag.
pub fn remove_tag<R: ManagedRuntime + ?Sized>(runtime: &R, key: Option<&R::Ref>) {
    match to_string_opt(runtime, key) {
        Some(key) => ndk_engine::remove_tag(&key),
        None => debug!("remove_tag ignored: key unavailable"),
    }
}

/// Sets an extra value, stored as a string.
pub fn set_extra<R: ManagedRuntime + ?Sized>(
    runtime: &R,
    key: Option<&R::Ref>,
    value: Option<&R::Ref>,
) {
    let (Some(key), Some(value)) = (to_string_opt(runtime, key), to_string_opt(runtime, value))
    else {
        debug!("set_extra ignored: key or value unavailable");
        return;
    };
    ndk_engine::set_extra(&key, Value::new_string(value));
}

/// Removes an extra value.
pub fn remove_extra<R: ManagedRuntime + ?Sized>(runtime: &R, key: Option<&R::Ref>) {
    match to_string_opt(runtime, key) {
        Some(key) => ndk_engine::remove_extra(&key),
        None => debug!("remove_extra ignored: key unavailable"),
    }
}

/// Replaces the current user with one holding only the given fields.
///
/// Fields of the previous user never carry over.
pub fn set_user<R: ManagedRuntime + ?Sized>(
    runtime: &R,
    id: Option<&R::Ref>,
    email: Option<&R::Ref>,
    ip_address: Option<&R::Ref>,
    username: Option<&R::Ref>,
) {
    let mut user = Value::new_object();
    for (key, field) in [
        ("id", id),
        ("email", email),
        ("ip_address", ip_address),
        ("username", username),
    ] {
        if let Some(value) = to_string_opt(runtime, field) {
            user.set_by_key(key, Value::new_string(value));
        }
    }
    ndk_engine::set_user(user);
}

/// Clears the current user.
pub fn remove_user() {
    ndk_engine::remove_user();
}

/// Adds a breadcrumb.
///
/// Does nothing when level, message, category and type are all null. The
/// engine stamps the breadcrumb when it is created; an explicit `timestamp`
/// replaces that stamp verbatim. `data` is attached as `{"data": data}`.
#[allow(clippy::too_many_arguments)]
pub fn add_breadcrumb<R: ManagedRuntime + ?Sized>(
    runtime: &R,
    level: Option<&R::Ref>,
    message: Option<&R::Ref>,
    category: Option<&R::Ref>,
    kind: Option<&R::Ref>,
    timestamp: Option<&R::Ref>,
    data: Option<&R::Ref>,
) {
    if level.is_none() && message.is_none() && category.is_none() && kind.is_none() {
        return;
    }

    let message = to_string_opt(runtime, message);
    let kind = to_string_opt(runtime, kind);
    let mut crumb = Value::new_breadcrumb(kind.as_deref(), message.as_deref());

    if let Some(category) = to_string_opt(runtime, category) {
        crumb.set_by_key("category", Value::new_string(category));
    }
    if let Some(level) = to_string_opt(runtime, level) {
        crumb.set_by_key("level", Value::new_string(level));
    }
    if let Some(timestamp) = to_string_opt(runtime, timestamp) {
        crumb.set_by_key("timestamp", Value::new_string(timestamp));
    }
    if let Some(data) = to_string_opt(runtime, data) {
        let mut wrapped = Value::new_object();
        wrapped.set_by_key("data", Value::new_string(data));
        crumb.set_by_key("data", wrapped);
    }

    ndk_engine::add_breadcrumb(crumb);
}
