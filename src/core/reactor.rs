//! Reactors: fire callbacks when a set of game state conditions starts or
//! stops holding.

use std::cell::Cell;
use std::rc::Rc;

use super::signal::{Signal, Subscription};
use super::state::{Condition, GameState};

type Callback = Box<dyn FnMut()>;

/// Watches AND-connected conditions and fires on transitions only.
///
/// Built with [`Reactor::new`] and activated with [`Reactor::attach`].
pub struct Reactor {
    conditions: Vec<Condition>,
    on_fulfilled: Option<Callback>,
    on_unfulfilled: Option<Callback>,
}

/// An attached reactor. Dropping it stops the reactor.
pub struct ActiveReactor {
    fulfilled: Rc<Cell<bool>>,
    _subscription: Subscription,
}

struct Watch {
    conditions: Vec<Condition>,
    state: GameState,
    fulfilled: Rc<Cell<bool>>,
    on_fulfilled: Option<Callback>,
    on_unfulfilled: Option<Callback>,
}

impl Watch {
    fn check(&mut self) {
        let now = self.state.check_conditions(&self.conditions);
        let was = self.fulfilled.replace(now);

        if !was && now {
            tracing::debug!(conditions = self.conditions.len(), "reactor fulfilled");
            if let Some(callback) = self.on_fulfilled.as_mut() {
                callback();
            }
        } else if was && !now {
            tracing::debug!(conditions = self.conditions.len(), "reactor unfulfilled");
            if let Some(callback) = self.on_unfulfilled.as_mut() {
                callback();
            }
        }
    }
}

impl Reactor {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self {
            conditions,
            on_fulfilled: None,
            on_unfulfilled: None,
        }
    }

    /// Called when the conditions go from unmet to met.
    pub fn on_fulfilled(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_fulfilled = Some(Box::new(callback));
        self
    }

    /// Called when the conditions go from met to unmet.
    pub fn on_unfulfilled(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_unfulfilled = Some(Box::new(callback));
        self
    }

    /// Start watching `state`.
    ///
    /// The conditions are checked once immediately, so a reactor attached to
    /// state that already satisfies it fires `on_fulfilled` right away.
    pub fn attach(self, state: &GameState) -> ActiveReactor {
        let fulfilled = Rc::new(Cell::new(false));
        let mut watch = Watch {
            conditions: self.conditions,
            state: state.clone(),
            fulfilled: Rc::clone(&fulfilled),
            on_fulfilled: self.on_fulfilled,
            on_unfulfilled: self.on_unfulfilled,
        };
        watch.check();

        let subscription = state.signals().subscribe(move |signal| {
            if let Signal::StateChanged { .. } = signal {
                watch.check();
            }
        });

        ActiveReactor {
            fulfilled,
            _subscription: subscription,
        }
    }
}

impl ActiveReactor {
    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled.get()
    }
}
