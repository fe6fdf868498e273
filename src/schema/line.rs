use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque entry point into a story, addressed as `knot.stitch`.
///
/// The controller never looks inside a path; it is handed to the story
/// engine unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialoguePath(pub String);

impl DialoguePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DialoguePath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl From<String> for DialoguePath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl fmt::Display for DialoguePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Visual treatment requested for a line. Surfaces decide how to render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StyleFlag {
    /// Internal monologue, typically rendered in italics.
    Thought,
}

/// A branch option presented to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Zero-based position, stable for one presentation step.
    pub index: usize,
    pub text: String,
}

/// A single line of dialogue, ready to display.
///
/// Built fresh for every advance step and never retained by the controller.
/// `body` has already had the speaker split off and escapes resolved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DialogueLine {
    pub speaker: Option<String>,
    pub body: String,
    pub style_flags: FxHashSet<StyleFlag>,
    pub choices: Vec<Choice>,
}

impl DialogueLine {
    /// Returns true if the line carries the given style flag.
    pub fn has_style(&self, flag: StyleFlag) -> bool {
        self.style_flags.contains(&flag)
    }

    pub fn is_thought(&self) -> bool {
        self.has_style(StyleFlag::Thought)
    }

    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }
}
