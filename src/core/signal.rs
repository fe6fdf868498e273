//! Outward signals: the process-wide channel other game systems listen on.
//!
//! Subscriptions live exactly as long as their [`Subscription`] guard.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

/// Something the dialogue engine announces to the rest of the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    DialogueOpened,
    DialogueClosed,
    /// Named event raised by the story script.
    ScriptEvent(String),
    /// A game state counter changed; `value` is the new total.
    StateChanged { key: String, value: i64 },
}

type Listener = Rc<RefCell<dyn FnMut(&Signal)>>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
    emitting: bool,
    /// Signals emitted by listeners during delivery, in emission order.
    pending: VecDeque<Signal>,
}

/// Cheaply cloneable handle to a shared set of listeners.
#[derive(Clone, Default)]
pub struct SignalBus {
    inner: Rc<RefCell<Listeners>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&Signal) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        let listener: Listener = Rc::new(RefCell::new(listener));
        inner.entries.push((id, listener));
        Subscription {
            bus: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Deliver a signal to every current listener, in subscription order.
    ///
    /// Listeners may subscribe or unsubscribe while a signal is delivered;
    /// changes take effect from the next signal. A signal emitted from inside
    /// a listener is queued and delivered to every listener once the current
    /// signal has reached all of them.
    pub fn emit(&self, signal: &Signal) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.emitting {
                inner.pending.push_back(signal.clone());
                return;
            }
            inner.emitting = true;
        }

        self.deliver(signal);
        loop {
            let next = self.inner.borrow_mut().pending.pop_front();
            match next {
                Some(queued) => self.deliver(&queued),
                None => break,
            }
        }

        self.inner.borrow_mut().emitting = false;
    }

    fn deliver(&self, signal: &Signal) {
        let snapshot: Vec<Listener> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in snapshot {
            let mut listener = listener.borrow_mut();
            (&mut *listener)(signal);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }
}

impl fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Guard for a listener registration. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener immediately"]
pub struct Subscription {
    bus: Weak<RefCell<Listeners>>,
    id: u64,
}

impl Subscription {
    /// Keep the listener registered for the rest of the bus's lifetime.
    pub fn detach(mut self) {
        self.bus = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.borrow_mut().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &SignalBus) -> (Rc<RefCell<Vec<Signal>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = bus.subscribe(move |signal| sink.borrow_mut().push(signal.clone()));
        (seen, sub)
    }

    #[test]
    fn listeners_receive_signals_in_order() {
        let bus = SignalBus::new();
        let (seen, _sub) = recorder(&bus);

        bus.emit(&Signal::DialogueOpened);
        bus.emit(&Signal::ScriptEvent("door_opened".to_string()));
        bus.emit(&Signal::DialogueClosed);

        assert_eq!(
            *seen.borrow(),
            vec![
                Signal::DialogueOpened,
                Signal::ScriptEvent("door_opened".to_string()),
                Signal::DialogueClosed,
            ]
        );
    }

    #[test]
    fn dropping_subscription_stops_delivery() {
        let bus = SignalBus::new();
        let (seen, sub) = recorder(&bus);
        assert_eq!(bus.listener_count(), 1);

        drop(sub);
        bus.emit(&Signal::DialogueOpened);

        assert!(seen.borrow().is_empty());
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn detached_subscription_stays_registered() {
        let bus = SignalBus::new();
        let (seen, sub) = recorder(&bus);

        sub.detach();
        bus.emit(&Signal::DialogueClosed);

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn subscription_outliving_bus_is_harmless() {
        let bus = SignalBus::new();
        let sub = bus.subscribe(|_| {});
        drop(bus);
        drop(sub);
    }

    #[test]
    fn signals_emitted_by_listeners_reach_every_listener_in_order() {
        let bus = SignalBus::new();
        let relay = bus.clone();
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let _chain = bus.subscribe(move |signal| {
            *counter.borrow_mut() += 1;
            match signal {
                Signal::DialogueOpened => {
                    relay.emit(&Signal::ScriptEvent("first".to_string()));
                    relay.emit(&Signal::ScriptEvent("second".to_string()));
                }
                Signal::ScriptEvent(name) if name == "first" => {
                    relay.emit(&Signal::DialogueClosed);
                }
                _ => {}
            }
        });
        let (seen, _sub) = recorder(&bus);

        bus.emit(&Signal::DialogueOpened);

        assert_eq!(
            *seen.borrow(),
            vec![
                Signal::DialogueOpened,
                Signal::ScriptEvent("first".to_string()),
                Signal::ScriptEvent("second".to_string()),
                Signal::DialogueClosed,
            ]
        );
        assert_eq!(*calls.borrow(), 4);

        // The queue is drained; later emits deliver immediately.
        bus.emit(&Signal::DialogueClosed);
        assert_eq!(seen.borrow().len(), 5);
    }
}
