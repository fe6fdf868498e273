//! Line parser: turns raw story text into a structured [`DialogueLine`].
//!
//! Wire format: `Speaker: body text`. A doubled separator (`::`) is a literal
//! separator character and never splits the line. A `thought` tag on the line
//! marks it as internal monologue.

use rustc_hash::FxHashSet;

use crate::schema::line::{DialogueLine, StyleFlag};

pub const DEFAULT_SEPARATOR: char = ':';
pub const DEFAULT_THOUGHT_TAG: &str = "thought";

/// Pure, configurable line parser. Holds no state between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineParser {
    separator: char,
    thought_tag: String,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR, DEFAULT_THOUGHT_TAG)
    }
}

impl LineParser {
    pub fn new(separator: char, thought_tag: impl Into<String>) -> Self {
        Self {
            separator,
            thought_tag: thought_tag.into(),
        }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Parse one unit of raw story text. Choices are left empty; the
    /// controller attaches them.
    ///
    /// More than one unescaped separator is an authoring mistake: it is
    /// logged, the first segment becomes the speaker and the remaining
    /// segments are rejoined with the separator as the body.
    pub fn parse(&self, raw: &str, tags: &FxHashSet<String>) -> DialogueLine {
        let mut segments = self.split(raw).into_iter();
        let first = segments.next().unwrap_or_default();
        let rest: Vec<String> = segments.collect();

        let (speaker, body) = if rest.is_empty() {
            (None, first)
        } else {
            if rest.len() > 1 {
                tracing::warn!(
                    line = raw,
                    separators = rest.len(),
                    "dialogue line has more than one speaker separator; \
                     using the first segment as the speaker"
                );
            }
            let separator = self.separator.to_string();
            (Some(first), rest.join(separator.as_str()))
        };

        let speaker = speaker
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut style_flags = FxHashSet::default();
        if tags.contains(self.thought_tag.as_str()) {
            style_flags.insert(StyleFlag::Thought);
        }

        DialogueLine {
            speaker,
            body: body.trim().to_string(),
            style_flags,
            choices: Vec::new(),
        }
    }

    /// Split on single separators, collapsing doubled ones to a literal.
    fn split(&self, raw: &str) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            if c != self.separator {
                current.push(c);
            } else if chars.peek() == Some(&self.separator) {
                chars.next();
                current.push(c);
            } else {
                segments.push(std::mem::take(&mut current));
            }
        }
        segments.push(current);
        segments
    }
}

/// Parse with the default separator and thought tag.
pub fn parse_line(raw: &str, tags: &FxHashSet<String>) -> DialogueLine {
    LineParser::default().parse(raw, tags)
}
