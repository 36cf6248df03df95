use crate::constants::{
    CONFIG_FILE, DEFAULT_FILE_NAME_PATTERN, DEFAULT_MESSAGE_START_PATTERN, RENDER_MARGIN,
};
use crate::core::{HighlightStyle, HighlighterSet, PatternConfig};
use crate::error::ConfigError;
use crate::highlight::default_highlighters;
use fancy_regex::Regex;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlighterConfig {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub bold: bool,
}

/// View settings as read from `.logaudit.json`. Missing fields fall back to
/// the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub message_start_pattern: String,
    pub highlighters: Vec<HighlighterConfig>,
    pub wrap_lines: bool,
    pub render_margin: usize,
    pub file_name_pattern: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            message_start_pattern: DEFAULT_MESSAGE_START_PATTERN.to_string(),
            highlighters: default_highlighters(),
            wrap_lines: false,
            render_margin: RENDER_MARGIN,
            file_name_pattern: DEFAULT_FILE_NAME_PATTERN.to_string(),
        }
    }
}

impl ViewConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Use `explicit` if given, else `.logaudit.json` in the working
    /// directory when present, else the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let local = Path::new(CONFIG_FILE);
        if local.exists() {
            tracing::info!(path = CONFIG_FILE, "loading config");
            return Self::load(local);
        }
        Ok(Self::default())
    }

    pub fn pattern_config(&self) -> Result<PatternConfig, ConfigError> {
        let mut highlighters = HighlighterSet::new();
        for h in &self.highlighters {
            let pattern = Regex::new(&h.pattern).map_err(|e| ConfigError::InvalidPattern {
                what: "highlighter",
                pattern: h.pattern.clone(),
                message: e.to_string(),
            })?;
            let text_color = h
                .text_color
                .as_deref()
                .map(|c| Color::from_str(c).map_err(|_| ConfigError::InvalidColor(c.to_string())))
                .transpose()?;
            highlighters.insert(
                h.name.clone(),
                pattern,
                HighlightStyle {
                    text_color,
                    bold: h.bold,
                },
            );
        }
        tracing::debug!(
            highlighters = highlighters.len(),
            message_start = %self.message_start_pattern,
            "compiled view patterns"
        );
        PatternConfig::new(&self.message_start_pattern, highlighters)
    }

    pub fn file_name_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.file_name_pattern).map_err(|e| ConfigError::InvalidPattern {
            what: "file name",
            pattern: self.file_name_pattern.clone(),
            message: e.to_string(),
        })
    }
}
