//! Engine configuration.

use crate::result::ConcordantResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine settings, loadable from YAML.
///
/// ```yaml
/// output_dir: target/concordant
/// embed_default_css: true
/// fresh_window_ms: 2000
/// max_nesting_depth: 16
/// extensions: [log-events]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Root directory for written output
    pub output_dir: PathBuf,
    /// Embed the outcome stylesheet into each document
    pub embed_default_css: bool,
    /// Assets written this recently are not rewritten
    pub fresh_window_ms: u64,
    /// Deepest allowed chain of nested runs
    pub max_nesting_depth: usize,
    /// Extension names, resolved in order through the extension catalog
    pub extensions: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("target/concordant"),
            embed_default_css: true,
            fresh_window_ms: 2000,
            max_nesting_depth: 16,
            extensions: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse YAML
    pub fn from_yaml(yaml: &str) -> ConcordantResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a YAML file
    pub fn from_path(path: &Path) -> ConcordantResult<Self> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Serialise to YAML
    pub fn to_yaml(&self) -> ConcordantResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Set the output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Toggle the embedded stylesheet
    #[must_use]
    pub const fn with_embed_default_css(mut self, embed: bool) -> Self {
        self.embed_default_css = embed;
        self
    }

    /// Set the freshness window in milliseconds
    #[must_use]
    pub const fn with_fresh_window_ms(mut self, ms: u64) -> Self {
        self.fresh_window_ms = ms;
        self
    }

    /// Set the maximum nesting depth
    #[must_use]
    pub const fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Append an extension name
    #[must_use]
    pub fn with_extension(mut self, name: impl Into<String>) -> Self {
        self.extensions.push(name.into());
        self
    }

    /// Freshness window as a duration
    #[must_use]
    pub const fn fresh_window(&self) -> Duration {
        Duration::from_millis(self.fresh_window_ms)
    }
}
