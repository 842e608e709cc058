//! The reporting scope.
//!
//! A [`Scope`] holds the context that is attached to every event captured
//! after it was set: tags, extra data, the current user and a bounded
//! breadcrumb history.
//!
//! The engine keeps exactly one scope per process. The free functions in
//! this module ([`set_tag`], [`add_breadcrumb`], ...) mutate that instance
//! under a lock, so callers on any thread may use them without their own
//! synchronization. The scope is reset by [`crate::close`] and otherwise
//! never reconstructed.

use crate::value::Value;
use parking_lot::{const_mutex, Mutex};
use std::collections::{BTreeMap, VecDeque};

/// Breadcrumb capacity used until options say otherwise.
pub const DEFAULT_MAX_BREADCRUMBS: usize = 100;

static GLOBAL_SCOPE: Mutex<Scope> = const_mutex(Scope::new());

/// Context attached to captured events.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    tags: BTreeMap<String, String>,
    extra: BTreeMap<String, Value>,
    user: Option<Value>,
    breadcrumbs: VecDeque<Value>,
    max_breadcrumbs: usize,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// Creates an empty scope with the default breadcrumb capacity.
    pub const fn new() -> Self {
        Self {
            tags: BTreeMap::new(),
            extra: BTreeMap::new(),
            user: None,
            breadcrumbs: VecDeque::new(),
            max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
        }
    }

    /// Sets a tag, replacing any previous value for `key`.
    pub fn set_tag(&mut self, key: &str, value: &str) {
        self.tags.insert(key.to_string(), value.to_string());
    }

    /// Removes a tag.
    pub fn remove_tag(&mut self, key: &str) {
        self.tags.remove(key);
    }

    /// Returns the tag for `key`.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Returns all tags.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Sets an extra value, replacing any previous value for `key`.
    pub fn set_extra(&mut self, key: &str, value: Value) {
        self.extra.insert(key.to_string(), value);
    }

    /// Removes an extra value.
    pub fn remove_extra(&mut self, key: &str) {
        self.extra.remove(key);
    }

    /// Returns the extra value for `key`.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Installs `user` as the current user.
    ///
    /// The previous user is discarded entirely; no fields carry over.
    pub fn set_user(&mut self, user: Value) {
        self.user = Some(user);
    }

    /// Clears the current user.
    pub fn remove_user(&mut self) {
        self.user = None;
    }

    /// Returns the current user.
    pub fn user(&self) -> Option<&Value> {
        self.user.as_ref()
    }

    /// Appends a breadcrumb, evicting the oldest ones beyond capacity.
    pub fn add_breadcrumb(&mut self, breadcrumb: Value) {
        self.breadcrumbs.push_back(breadcrumb);
        self.trim_breadcrumbs();
    }

    /// Returns the breadcrumb history, oldest first.
    pub fn breadcrumbs(&self) -> &VecDeque<Value> {
        &self.breadcrumbs
    }

    /// Returns the breadcrumb capacity.
    pub fn max_breadcrumbs(&self) -> usize {
        self.max_breadcrumbs
    }

    /// Changes the breadcrumb capacity, evicting if the history is now too long.
    pub fn set_max_breadcrumbs(&mut self, max: usize) {
        self.max_breadcrumbs = max;
        self.trim_breadcrumbs();
    }

    fn trim_breadcrumbs(&mut self) {
        while self.breadcrumbs.len() > self.max_breadcrumbs {
            self.breadcrumbs.pop_front();
        }
    }

    /// Merges this scope into an event object.
    ///
    /// Keys already present on the event win over scope tags and extra; the
    /// user is only attached when the event has none. Breadcrumbs are always
    /// attached when there are any.
    pub fn apply_to_event(&self, event: &mut Value) {
        if !self.tags.is_empty() {
            let mut tags = take_object(event, "tags");
            for (key, value) in &self.tags {
                if tags.get_by_key(key).is_null() {
                    tags.set_by_key(key, Value::new_string(value.as_str()));
                }
            }
            event.set_by_key("tags", tags);
        }

        if !self.extra.is_empty() {
            let mut extra = take_object(event, "extra");
            for (key, value) in &self.extra {
                if extra.get_by_key(key).is_null() {
                    extra.set_by_key(key, value.clone());
                }
            }
            event.set_by_key("extra", extra);
        }

        if let Some(user) = &self.user {
            if event.get_by_key("user").is_null() {
                event.set_by_key("user", user.clone());
            }
        }

        if !self.breadcrumbs.is_empty() {
            let values = Value::List(self.breadcrumbs.iter().cloned().collect());
            let mut wrapper = Value::new_object();
            wrapper.set_by_key("values", values);
            event.set_by_key("breadcrumbs", wrapper);
        }
    }

    /// Resets everything, including the breadcrumb capacity.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

fn take_object(event: &Value, key: &str) -> Value {
    match event.get_by_key(key) {
        existing @ Value::Object(_) => existing.clone(),
        _ => Value::new_object(),
    }
}

/// Runs `f` with shared access to the process-wide scope.
pub fn with_scope<R>(f: impl FnOnce(&Scope) -> R) -> R {
    f(&GLOBAL_SCOPE.lock())
}

/// Runs `f` with exclusive access to the process-wide scope.
pub fn with_scope_mut<R>(f: impl FnOnce(&mut Scope) -> R) -> R {
    f(&mut GLOBAL_SCOPE.lock())
}

/// Sets a tag on the process-wide scope.
pub fn set_tag(key: &str, value: &str) {
    with_scope_mut(|scope| scope.set_tag(key, value));
}

/// Removes a tag from the process-wide scope.
pub fn remove_tag(key: &str) {
    with_scope_mut(|scope| scope.remove_tag(key));
}

/// Sets an extra value on the process-wide scope.
pub fn set_extra(key: &str, value: Value) {
    with_scope_mut(|scope| scope.set_extra(key, value));
}

/// Removes an extra value from the process-wide scope.
pub fn remove_extra(key: &str) {
    with_scope_mut(|scope| scope.remove_extra(key));
}

/// Replaces the user on the process-wide scope.
pub fn set_user(user: Value) {
    with_scope_mut(|scope| scope.set_user(user));
}

/// Clears the user on the process-wide scope.
pub fn remove_user() {
    with_scope_mut(Scope::remove_user);
}

/// Adds a breadcrumb to the process-wide scope.
pub fn add_breadcrumb(breadcrumb: Value) {
    with_scope_mut(|scope| scope.add_breadcrumb(breadcrumb));
}
