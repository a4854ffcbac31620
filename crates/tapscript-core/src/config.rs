//! Interpreter configuration.
//!
//! Stored as JSON, by default in `~/.tapscript/config.json`. Every field has a
//! default, so a partial (or empty) file is valid.
//!
//! # Example
//!
//! ```no_run
//! use tapscript_core::config::{InterpreterConfig, LabelResolution};
//!
//! // Load (returns defaults if the file doesn't exist)
//! let mut config = InterpreterConfig::load();
//!
//! // Opt back into labels registered only as they execute
//! config.label_resolution = LabelResolution::Lazy;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parser::ParseOptions;

const CONFIG_FILENAME: &str = "config.json";

/// Returns the tapscript settings directory (`~/.tapscript/`), if a home
/// directory is known.
pub fn tapscript_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tapscript"))
}

/// When label positions become known to `goto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelResolution {
    /// All labels of a sequence are collected before it runs, so forward
    /// jumps work.
    #[default]
    Eager,
    /// A label is registered only once it has executed. Forward jumps fail.
    Lazy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Pause after every gesture dispatch, in milliseconds.
    pub settle_delay_ms: u64,

    /// How long `logs` overlays stay on screen, in milliseconds.
    pub overlay_duration_ms: u64,

    pub label_resolution: LabelResolution,

    /// Require block terminators to match their opener (`endif` for `if`, ...).
    /// `end` always closes any block.
    pub strict_terminators: bool,

    /// Evaluate `set name a op b`. When off, the text `a op b` is stored as is.
    pub set_arithmetic: bool,

    /// Maximum nesting of `call`.
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 50,
            overlay_duration_ms: 3000,
            label_resolution: LabelResolution::Eager,
            strict_terminators: true,
            set_arithmetic: true,
            max_call_depth: 64,
        }
    }
}

impl InterpreterConfig {
    /// Load config from `~/.tapscript/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        tapscript_dir()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .and_then(|path| Self::load_from(&path).ok())
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn overlay_duration(&self) -> Duration {
        Duration::from_millis(self.overlay_duration_ms)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            strict_terminators: self.strict_terminators,
        }
    }
}
