//! Dialogue configuration, loadable from RON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::parser::{LineParser, DEFAULT_SEPARATOR, DEFAULT_THOUGHT_TAG};

/// Default ceiling on consecutive empty lines skipped in one advance.
pub const DEFAULT_MAX_SKIPPED_LINES: usize = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid speaker separator {0:?}")]
    InvalidSeparator(char),
    #[error("max_skipped_lines must be at least 1")]
    ZeroSkipLimit,
    #[error("bridge function names must be distinct and non-empty")]
    InvalidFunctionNames,
}

/// Script-facing names of the state bridge functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeFunctions {
    /// `(name)`: broadcast a named script event.
    pub emit_event: String,
    /// `(key) -> int`: read a counter.
    pub read_counter: String,
    /// `(key, delta)`: add to a counter.
    pub add_counter: String,
}

impl Default for BridgeFunctions {
    fn default() -> Self {
        Self {
            emit_event: "Unity_Event".to_string(),
            read_counter: "Get_State".to_string(),
            add_counter: "Add_State".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    pub separator: char,
    pub thought_tag: String,
    pub max_skipped_lines: usize,
    pub functions: BridgeFunctions,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            thought_tag: DEFAULT_THOUGHT_TAG.to_string(),
            max_skipped_lines: DEFAULT_MAX_SKIPPED_LINES,
            functions: BridgeFunctions::default(),
        }
    }
}

impl DialogueConfig {
    pub fn load_from_ron(path: &Path) -> Result<DialogueConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse and validate a config. Missing fields take their defaults.
    pub fn parse_ron(input: &str) -> Result<DialogueConfig, ConfigError> {
        let config: DialogueConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.separator.is_whitespace() {
            return Err(ConfigError::InvalidSeparator(self.separator));
        }
        if self.max_skipped_lines == 0 {
            return Err(ConfigError::ZeroSkipLimit);
        }
        let f = &self.functions;
        let names = [&f.emit_event, &f.read_counter, &f.add_counter];
        if names.iter().any(|n| n.is_empty())
            || f.emit_event == f.read_counter
            || f.emit_event == f.add_counter
            || f.read_counter == f.add_counter
        {
            return Err(ConfigError::InvalidFunctionNames);
        }
        Ok(())
    }

    pub fn parser(&self) -> LineParser {
        LineParser::new(self.separator, self.thought_tag.clone())
    }
}
