//! Event hook registry
//!
//! Hooks are bound by name. Lookups that miss fall back to the default
//! handler, which forwards to whatever is registered under `on_default` and
//! does nothing otherwise. Hook errors are returned to the caller untouched;
//! deciding whether they matter is the dispatcher's job.

use super::{ChatEvent, EventKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Reserved name of the fallback hook
pub const DEFAULT_EVENT: &str = "on_default";

pub type HookError = Box<dyn std::error::Error + Send + Sync>;
pub type HookResult = std::result::Result<(), HookError>;

pub type EventCallback = Arc<dyn Fn(&ChatEvent) -> HookResult + Send + Sync>;

/// Hook as an object, for handlers that carry their own state
pub trait EventHandler: Send + Sync + 'static {
    fn handle(&self, event: &ChatEvent) -> HookResult;
}

#[derive(Clone)]
pub struct EventBinding {
    pub name: String,
    pub handler: EventCallback,
    pub documentation: Option<String>,
}

impl std::fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBinding")
            .field("name", &self.name)
            .field("documentation", &self.documentation)
            .finish()
    }
}

/// Name → hook map
///
/// Mutation takes `&mut self`; share it behind a lock and clone handlers out
/// of it (see [`get`](Self::get)) before calling them, so a hook may
/// register further hooks.
#[derive(Default)]
pub struct EventRegistry {
    bindings: HashMap<String, EventBinding>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `name`, returning the binding it replaced
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> Option<EventBinding>
    where
        F: Fn(&ChatEvent) -> HookResult + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(handler), None)
    }

    pub fn register_documented<F>(
        &mut self,
        name: impl Into<String>,
        documentation: impl Into<String>,
        handler: F,
    ) -> Option<EventBinding>
    where
        F: Fn(&ChatEvent) -> HookResult + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(handler), Some(documentation.into()))
    }

    /// Bind a hook by kind instead of name
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> Option<EventBinding>
    where
        F: Fn(&ChatEvent) -> HookResult + Send + Sync + 'static,
    {
        self.register(kind.name(), handler)
    }

    /// Bind an [`EventHandler`] object to `name`
    pub fn register_handler<H: EventHandler>(
        &mut self,
        name: impl Into<String>,
        handler: H,
    ) -> Option<EventBinding> {
        self.register(name, move |event: &ChatEvent| handler.handle(event))
    }

    fn insert(
        &mut self,
        name: String,
        handler: EventCallback,
        documentation: Option<String>,
    ) -> Option<EventBinding> {
        let binding = EventBinding {
            name: name.clone(),
            handler,
            documentation,
        };
        self.bindings.insert(name, binding)
    }

    /// Handler bound to `name`, or the default handler
    pub fn get(&self, name: &str) -> EventCallback {
        match self.bindings.get(name) {
            Some(binding) => Arc::clone(&binding.handler),
            None => self.default_handler(),
        }
    }

    /// `on_default` if registered, otherwise a no-op
    pub fn default_handler(&self) -> EventCallback {
        match self.bindings.get(DEFAULT_EVENT) {
            Some(binding) => Arc::clone(&binding.handler),
            None => Arc::new(|_: &ChatEvent| -> HookResult { Ok(()) }),
        }
    }

    /// Call the handler for `name` (or the default) with `event`
    pub fn invoke(&self, name: &str, event: &ChatEvent) -> HookResult {
        (self.get(name))(event)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn binding(&self, name: &str) -> Option<&EventBinding> {
        self.bindings.get(name)
    }

    pub fn documentation(&self, name: &str) -> Option<&str> {
        self.bindings.get(name)?.documentation.as_deref()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> EventCallback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);
        let make = move |tag: &str| -> EventCallback {
            let log = Arc::clone(&log_clone);
            let tag = tag.to_string();
            Arc::new(move |_: &ChatEvent| -> HookResult {
                log.lock().push(tag.clone());
                Ok(())
            })
        };
        (log, make)
    }

    #[test]
    fn test_register_overwrites() {
        let (log, make) = recorder();
        let mut registry = EventRegistry::new();

        let first = make("first");
        registry.register("on_ping", move |e: &ChatEvent| first(e));
        let second = make("second");
        let replaced = registry.register("on_ping", move |e: &ChatEvent| second(e));

        assert!(replaced.is_some());
        registry.invoke("on_ping", &ChatEvent::Ping(json!({}))).unwrap();
        assert_eq!(*log.lock(), vec!["second"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_miss_without_default_is_noop() {
        let registry = EventRegistry::new();
        assert!(registry.invoke("on_message", &ChatEvent::Disconnect).is_ok());
    }

    #[test]
    fn test_miss_forwards_to_on_default() {
        let (log, make) = recorder();
        let mut registry = EventRegistry::new();
        let default = make("default");
        registry.on(EventKind::Default, move |e: &ChatEvent| default(e));

        registry.invoke("on_user_join", &ChatEvent::Disconnect).unwrap();
        registry.invoke("anything", &ChatEvent::Disconnect).unwrap();

        assert_eq!(*log.lock(), vec!["default", "default"]);
    }

    #[test]
    fn test_handler_errors_propagate() {
        let mut registry = EventRegistry::new();
        registry.register("on_connect", |_: &ChatEvent| Err("boom".into()));

        let err = registry
            .invoke("on_connect", &ChatEvent::Connect(json!({})))
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_handler_objects() {
        struct Counter(Arc<Mutex<usize>>);

        impl EventHandler for Counter {
            fn handle(&self, _event: &ChatEvent) -> HookResult {
                *self.0.lock() += 1;
                Ok(())
            }
        }

        let count = Arc::new(Mutex::new(0));
        let mut registry = EventRegistry::new();
        registry.register_handler("on_disconnect", Counter(Arc::clone(&count)));

        registry.invoke("on_disconnect", &ChatEvent::Disconnect).unwrap();
        registry.invoke("on_disconnect", &ChatEvent::Disconnect).unwrap();
        assert_eq!(*count.lock(), 2);
    }

    #[test]
    fn test_documentation_and_names() {
        let mut registry = EventRegistry::new();
        registry.register_documented("on_message", "log every message", |_: &ChatEvent| Ok(()));
        registry.register("on_connect", |_: &ChatEvent| Ok(()));

        assert_eq!(registry.documentation("on_message"), Some("log every message"));
        assert_eq!(registry.documentation("on_connect"), None);
        assert_eq!(registry.names(), vec!["on_connect", "on_message"]);
        assert!(registry.contains("on_connect"));
    }
}
