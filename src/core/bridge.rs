//! State bridge: the script-callable functions that read and change game
//! state and raise outward events.

use super::config::BridgeFunctions;
use super::signal::{Signal, SignalBus};
use super::state::GameState;
use crate::schema::value::Value;
use crate::story::{StoryEngine, StoryError};

/// Adapter between story script calls and the shared [`GameState`].
///
/// `add_counter` is the only path by which the script mutates game state.
#[derive(Debug, Clone)]
pub struct StateBridge {
    state: GameState,
}

impl StateBridge {
    pub fn new(state: GameState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn signals(&self) -> &SignalBus {
        self.state.signals()
    }

    /// Re-broadcast a script event. Fire-and-forget.
    pub fn emit_event(&self, name: &str) {
        tracing::debug!(event = name, "script event");
        self.signals().emit(&Signal::ScriptEvent(name.to_string()));
    }

    pub fn read_counter(&self, key: &str) -> i64 {
        self.state.get(key)
    }

    pub fn add_counter(&self, key: &str, delta: i64) {
        self.state.add(key, delta);
    }

    /// Register the three bridge functions with `engine`.
    ///
    /// Done once per engine; the bindings stay valid for the engine's
    /// lifetime across all dialogue sessions.
    pub fn bind<E: StoryEngine + ?Sized>(
        &self,
        engine: &mut E,
        names: &BridgeFunctions,
    ) -> Result<(), StoryError> {
        let bridge = self.clone();
        let name = names.emit_event.clone();
        engine.bind_external_function(
            &names.emit_event,
            1,
            Box::new(move |args| {
                bridge.emit_event(string_arg(&name, args, 0)?);
                Ok(None)
            }),
        )?;

        let bridge = self.clone();
        let name = names.read_counter.clone();
        engine.bind_external_function(
            &names.read_counter,
            1,
            Box::new(move |args| {
                let key = string_arg(&name, args, 0)?;
                Ok(Some(Value::Int(bridge.read_counter(key))))
            }),
        )?;

        let bridge = self.clone();
        let name = names.add_counter.clone();
        engine.bind_external_function(
            &names.add_counter,
            2,
            Box::new(move |args| {
                let key = string_arg(&name, args, 0)?;
                let delta = int_arg(&name, args, 1)?;
                bridge.add_counter(key, delta);
                Ok(None)
            }),
        )?;

        tracing::debug!(
            emit_event = %names.emit_event,
            read_counter = %names.read_counter,
            add_counter = %names.add_counter,
            "state bridge bound"
        );
        Ok(())
    }
}

fn arg<'a>(function: &str, args: &'a [Value], position: usize) -> Result<&'a Value, StoryError> {
    args.get(position).ok_or_else(|| StoryError::ArityMismatch {
        name: function.to_string(),
        expected: position + 1,
        got: args.len(),
    })
}

fn string_arg<'a>(function: &str, args: &'a [Value], position: usize) -> Result<&'a str, StoryError> {
    let value = arg(function, args, position)?;
    value.as_str().ok_or_else(|| StoryError::ArgumentType {
        name: function.to_string(),
        position,
        expected: "string",
        got: value.type_name(),
    })
}

fn int_arg(function: &str, args: &[Value], position: usize) -> Result<i64, StoryError> {
    let value = arg(function, args, position)?;
    value.as_int().ok_or_else(|| StoryError::ArgumentType {
        name: function.to_string(),
        position,
        expected: "int",
        got: value.type_name(),
    })
}
