//! Store configuration, loadable from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Result;

/// Tuning knobs for a knowledge base.
///
/// ```toml
/// entity_separator = "_"
/// token_capacity = 1048576
/// span_capacity = 65536
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KbConfig {
    /// Joins span tokens into an entity name when no explicit name is given.
    pub entity_separator: String,

    /// Tokens reserved in the packed array of a new partition.
    pub token_capacity: usize,

    /// Spans reserved in the span arrays of a new partition.
    pub span_capacity: usize,
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            entity_separator: "_".to_string(),
            token_capacity: 0,
            span_capacity: 0,
        }
    }
}

impl KbConfig {
    /// Parse a configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn with_entity_separator(mut self, separator: impl Into<String>) -> Self {
        self.entity_separator = separator.into();
        self
    }

    pub fn with_capacity(mut self, tokens: usize, spans: usize) -> Self {
        self.token_capacity = tokens;
        self.span_capacity = spans;
        self
    }
}
