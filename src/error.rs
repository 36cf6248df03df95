//! Error types shared by the parsing pipeline, the viewport and the result list.

use thiserror::Error;

/// The configuration does not fit the input, or could not be loaded.
///
/// These are reported distinctly from "no results": a wrong message start
/// pattern would otherwise collapse a whole file into one message.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {what} pattern '{pattern}': {message}")]
    InvalidPattern {
        what: &'static str,
        pattern: String,
        message: String,
    },

    #[error("message start pattern does not match line {line}: {preview}")]
    StartPatternMismatch { line: usize, preview: String },

    #[error("unknown sort column: {0}")]
    UnknownColumn(String),

    #[error("invalid colour '{0}'")]
    InvalidColor(String),

    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: String, message: String },
}

/// A navigation request referenced something that does not exist.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("message {requested} out of range (document has {count} messages)")]
    MessageOutOfRange { requested: usize, count: usize },

    #[error("row {requested} out of range (list has {count} rows)")]
    RowOutOfRange { requested: usize, count: usize },
}
