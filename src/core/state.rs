//! Game state: shared named integer counters.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use super::signal::{Signal, SignalBus};

/// How a counter is compared against a condition's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    Equal,
    NotEqual,
    #[default]
    AtLeast,
    AtMost,
    Greater,
    Less,
}

impl Comparison {
    pub fn holds(&self, current: i64, value: i64) -> bool {
        match self {
            Self::Equal => current == value,
            Self::NotEqual => current != value,
            Self::AtLeast => current >= value,
            Self::AtMost => current <= value,
            Self::Greater => current > value,
            Self::Less => current < value,
        }
    }
}

/// A requirement on a single counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub key: String,
    #[serde(default)]
    pub comparison: Comparison,
    pub value: i64,
}

impl Condition {
    pub fn new(key: impl Into<String>, comparison: Comparison, value: i64) -> Self {
        Self {
            key: key.into(),
            comparison,
            value,
        }
    }

    pub fn at_least(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, Comparison::AtLeast, value)
    }
}

/// Handle to the game's counter table.
///
/// Clones share the same table. Unknown keys read as 0 and are created on
/// first [`add`](GameState::add). Every change is announced on the signal
/// bus as [`Signal::StateChanged`].
#[derive(Debug, Clone)]
pub struct GameState {
    counters: Rc<RefCell<FxHashMap<String, i64>>>,
    signals: SignalBus,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(SignalBus::new())
    }
}

impl GameState {
    pub fn new(signals: SignalBus) -> Self {
        Self {
            counters: Rc::new(RefCell::new(FxHashMap::default())),
            signals,
        }
    }

    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    pub fn get(&self, key: &str) -> i64 {
        self.counters.borrow().get(key).copied().unwrap_or(0)
    }

    /// Add `delta` (which may be negative) to `key` and return the new value.
    pub fn add(&self, key: &str, delta: i64) -> i64 {
        let value = {
            let mut counters = self.counters.borrow_mut();
            let entry = counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(delta);
            *entry
        };
        tracing::debug!(key, delta, value, "game state changed");
        self.signals.emit(&Signal::StateChanged {
            key: key.to_string(),
            value,
        });
        value
    }

    /// Returns true if ALL conditions hold. An empty list always holds.
    pub fn check_conditions(&self, conditions: &[Condition]) -> bool {
        let counters = self.counters.borrow();
        conditions.iter().all(|condition| {
            let current = counters.get(&condition.key).copied().unwrap_or(0);
            condition.comparison.holds(current, condition.value)
        })
    }

    /// All counters that have been written, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, i64)> {
        let mut entries: Vec<(String, i64)> = self
            .counters
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        entries.sort();
        entries
    }
}
