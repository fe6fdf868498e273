//! Event router: maps script event names to host handlers.

use rustc_hash::FxHashMap;

use super::signal::{Signal, SignalBus, Subscription};

type Handler = Box<dyn FnMut()>;

/// A table of named handlers for [`Signal::ScriptEvent`].
///
/// Only the handler registered under the exact event name runs. Names with
/// no handler are ignored.
#[derive(Default)]
pub struct EventRouter {
    handlers: FxHashMap<String, Handler>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. The first registration for a name wins.
    pub fn on(mut self, name: impl Into<String>, handler: impl FnMut() + 'static) -> Self {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            tracing::warn!(event = %name, "duplicate script event handler ignored");
        } else {
            self.handlers.insert(name, Box::new(handler));
        }
        self
    }

    /// Run the handler for `name`. Returns false if none is registered.
    pub fn dispatch(&mut self, name: &str) -> bool {
        match self.handlers.get_mut(name) {
            Some(handler) => {
                handler();
                true
            }
            None => {
                tracing::debug!(event = name, "no handler for script event");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Start routing script events from `signals`. Dropping the returned
    /// subscription stops routing.
    pub fn attach(mut self, signals: &SignalBus) -> Subscription {
        signals.subscribe(move |signal| {
            if let Signal::ScriptEvent(name) = signal {
                self.dispatch(name);
            }
        })
    }
}
