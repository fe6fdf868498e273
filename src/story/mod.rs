//! Story engine contract: what an embedded branching-story interpreter must
//! provide for the dialogue controller to drive it.
//!
//! The interpreter itself is a black box. `scripted` holds a small in-memory
//! implementation used by the tools, demos and tests.

pub mod scripted;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::schema::line::{Choice, DialoguePath};
use crate::schema::value::Value;

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("unknown dialogue path: {0}")]
    UnknownPath(String),
    #[error("story cannot continue")]
    CannotContinue,
    #[error("choice {index} is not available ({available} presented)")]
    InvalidChoice { index: usize, available: usize },
    #[error("external function '{0}' is already bound")]
    AlreadyBound(String),
    #[error("external function '{0}' is not bound")]
    UnboundFunction(String),
    #[error("external function '{name}' takes {expected} arguments, got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("external function '{name}' expects {expected} for argument {position}, got {got}")]
    ArgumentType {
        name: String,
        position: usize,
        expected: &'static str,
        got: &'static str,
    },
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Host function callable from script. Arity is checked by the engine before
/// the call.
pub type ExternalFunction = Box<dyn FnMut(&[Value]) -> Result<Option<Value>, StoryError>>;

/// Severity of a message reported by the story engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Only meaningful to script-authoring tools; never logged at runtime.
    Author,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Error)]
#[error("unrecognized message severity: {0:?}")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    /// Engines that report raw severity names convert them here. Anything
    /// outside the known set is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "author" => Ok(Self::Author),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Author => "AUTHOR",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// A runtime message from the story engine's error channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptMessage {
    pub message: String,
    pub severity: Severity,
}

impl ScriptMessage {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// The interface the dialogue controller drives.
///
/// One engine instance holds one compiled script. Its cursor persists across
/// dialogue sessions until the engine is dropped.
pub trait StoryEngine {
    /// Jump to an entry point, like `-> knot.stitch` in script.
    fn choose_path(&mut self, path: &DialoguePath) -> Result<(), StoryError>;

    /// Whether another unit of text can be produced without a choice.
    fn can_continue(&self) -> bool;

    /// Advance exactly one unit and return its raw text.
    fn continue_story(&mut self) -> Result<String, StoryError>;

    /// Tags attached to the unit most recently returned by `continue_story`.
    fn current_tags(&self) -> FxHashSet<String>;

    fn current_choices(&self) -> Vec<Choice>;

    fn choose_choice_index(&mut self, index: usize) -> Result<(), StoryError>;

    fn bind_external_function(
        &mut self,
        name: &str,
        arity: usize,
        function: ExternalFunction,
    ) -> Result<(), StoryError>;

    /// Take all messages reported since the last drain.
    fn drain_messages(&mut self) -> Vec<ScriptMessage>;
}

impl<E: StoryEngine + ?Sized> StoryEngine for Box<E> {
    fn choose_path(&mut self, path: &DialoguePath) -> Result<(), StoryError> {
        (**self).choose_path(path)
    }

    fn can_continue(&self) -> bool {
        (**self).can_continue()
    }

    fn continue_story(&mut self) -> Result<String, StoryError> {
        (**self).continue_story()
    }

    fn current_tags(&self) -> FxHashSet<String> {
        (**self).current_tags()
    }

    fn current_choices(&self) -> Vec<Choice> {
        (**self).current_choices()
    }

    fn choose_choice_index(&mut self, index: usize) -> Result<(), StoryError> {
        (**self).choose_choice_index(index)
    }

    fn bind_external_function(
        &mut self,
        name: &str,
        arity: usize,
        function: ExternalFunction,
    ) -> Result<(), StoryError> {
        (**self).bind_external_function(name, arity, function)
    }

    fn drain_messages(&mut self) -> Vec<ScriptMessage> {
        (**self).drain_messages()
    }
}
