use crate::constants::TIMESTAMP_PATTERN;
use crate::core::tokenizer::{parse_line, HighlighterSet, Token};
use crate::error::ConfigError;
use fancy_regex::Regex;
use std::sync::{Arc, LazyLock};

static TIMESTAMP: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(TIMESTAMP_PATTERN).unwrap()
});

const PREVIEW_CHARS: usize = 80;

/// Byte offsets of one physical line, excluding its line break.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineSpan {
    pub start_offset: usize,
    pub end_offset: usize,
}

/// A physical line borrowed from a [`LogDocument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line<'a> {
    pub text: &'a str,
    pub index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Half-open line range `[line_start, line_end)` of one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageBoundary {
    pub line_start: usize,
    pub line_end: usize,
}

/// One logical log event as seen by the audits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogMessage<'a> {
    pub num: usize,
    pub text: &'a str,
    pub header: &'a str,
    pub line_start: usize,
    pub line_end: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    pub time_stamp: Option<&'a str>,
}

/// Patterns a document is parsed with. Built once per view and passed by
/// reference, so parsing can run on any thread.
#[derive(Clone, Debug)]
pub struct PatternConfig {
    message_start: Regex,
    message_start_source: String,
    highlighters: HighlighterSet,
}

impl PatternConfig {
    pub fn new(message_start: &str, highlighters: HighlighterSet) -> Result<Self, ConfigError> {
        let anchored = Regex::new(&format!("^(?:{})", message_start)).map_err(|e| {
            ConfigError::InvalidPattern {
                what: "message start",
                pattern: message_start.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            message_start: anchored,
            message_start_source: message_start.to_string(),
            highlighters,
        })
    }

    pub fn message_start_source(&self) -> &str {
        &self.message_start_source
    }

    pub fn highlighters(&self) -> &HighlighterSet {
        &self.highlighters
    }

    fn starts_message(&self, line: &str) -> bool {
        match self.message_start.is_match(line) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::debug!(error = %e, "message start pattern failed on line");
                false
            }
        }
    }
}

/// Split on `\r?\n`. A trailing line break yields a final empty line.
pub fn split_lines(text: &str) -> Vec<LineSpan> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices('\n') {
        let end = if pos > start && text.as_bytes()[pos - 1] == b'\r' {
            pos - 1
        } else {
            pos
        };
        lines.push(LineSpan {
            start_offset: start,
            end_offset: end,
        });
        start = pos + 1;
    }
    lines.push(LineSpan {
        start_offset: start,
        end_offset: text.len(),
    });
    lines
}

/// Group lines into messages in one forward scan.
///
/// The first message always starts at line 0. Blank lines before the first
/// non-blank line belong to it; that first non-blank line must match the
/// message start pattern.
pub fn segment(
    text: &str,
    lines: &[LineSpan],
    config: &PatternConfig,
) -> Result<Vec<MessageBoundary>, ConfigError> {
    let mut boundaries = Vec::new();
    let mut current_start = 0;
    let mut seen_content = false;

    for (index, span) in lines.iter().enumerate() {
        let line = &text[span.start_offset..span.end_offset];
        if !seen_content {
            if line.trim().is_empty() {
                continue;
            }
            seen_content = true;
            if !config.starts_message(line) {
                return Err(ConfigError::StartPatternMismatch {
                    line: index + 1,
                    preview: line.chars().take(PREVIEW_CHARS).collect(),
                });
            }
            continue;
        }
        if config.starts_message(line) {
            boundaries.push(MessageBoundary {
                line_start: current_start,
                line_end: index,
            });
            current_start = index;
        }
    }

    if !lines.is_empty() {
        boundaries.push(MessageBoundary {
            line_start: current_start,
            line_end: lines.len(),
        });
    }
    Ok(boundaries)
}

/// A parsed log file: its text, physical lines and message boundaries.
#[derive(Debug)]
pub struct LogDocument {
    text: Arc<str>,
    lines: Vec<LineSpan>,
    boundaries: Vec<MessageBoundary>,
    highlighters: HighlighterSet,
}

impl LogDocument {
    pub fn parse(text: impl Into<Arc<str>>, config: &PatternConfig) -> Result<Self, ConfigError> {
        let text = text.into();
        let lines = split_lines(&text);
        let boundaries = segment(&text, &lines, config)?;
        Ok(Self {
            text,
            lines,
            boundaries,
            highlighters: config.highlighters().clone(),
        })
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<Line<'_>> {
        let span = self.lines.get(index)?;
        Some(Line {
            text: &self.text[span.start_offset..span.end_offset],
            index,
            start_offset: span.start_offset,
            end_offset: span.end_offset,
        })
    }

    pub fn line_text(&self, index: usize) -> &str {
        self.line(index).map_or("", |line| line.text)
    }

    pub fn boundaries(&self) -> &[MessageBoundary] {
        &self.boundaries
    }

    pub fn message_count(&self) -> usize {
        self.boundaries.len()
    }

    /// Index of the message containing `line`, clamped to the last message.
    pub fn message_index_of_line(&self, line: usize) -> usize {
        self.boundaries
            .partition_point(|b| b.line_end <= line)
            .min(self.boundaries.len().saturating_sub(1))
    }

    pub fn message(&self, num: usize) -> Option<LogMessage<'_>> {
        let boundary = self.boundaries.get(num)?;
        let start_offset = self.lines[boundary.line_start].start_offset;
        let end_offset = self.lines[boundary.line_end - 1].end_offset;
        let text = &self.text[start_offset..end_offset];
        Some(LogMessage {
            num,
            text,
            header: self.line_text(boundary.line_start),
            line_start: boundary.line_start,
            line_end: boundary.line_end,
            start_offset,
            end_offset,
            time_stamp: TIMESTAMP.find(text).map(|m| m.as_str()),
        })
    }

    pub fn messages(&self) -> Vec<LogMessage<'_>> {
        (0..self.boundaries.len())
            .filter_map(|num| self.message(num))
            .collect()
    }

    pub fn highlighters(&self) -> &HighlighterSet {
        &self.highlighters
    }

    pub fn tokenize_line(&self, index: usize) -> Vec<Token<'_>> {
        parse_line(self.line_text(index), &self.highlighters)
    }
}
