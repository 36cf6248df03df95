use crate::config::HighlighterConfig;
use crate::constants::TIMESTAMP_PATTERN;
use crate::core::{HighlightStyle, HighlighterSet, Token};
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;

/// Built-in highlighters, applied in this order.
pub fn default_highlighters() -> Vec<HighlighterConfig> {
    let rule = |name: &str, pattern: &str, color: &str, bold: bool| HighlighterConfig {
        name: name.to_string(),
        pattern: pattern.to_string(),
        text_color: Some(color.to_string()),
        bold,
    };
    vec![
        rule("timestamp", TIMESTAMP_PATTERN, "magenta", false),
        rule("severe", r"\b(?:ERROR|FATAL)\b", "red", true),
        rule("warning", r"\bWARN(?:ING)?\b", "yellow", true),
        rule("info", r"\bINFO\b", "green", true),
        rule("debug", r"\b(?:DEBUG|TRACE)\b", "cyan", false),
        rule("thread", r"#\d+", "darkgray", false),
        rule("bracket", r"\[[^\]]+\]", "blue", false),
    ]
}

impl From<HighlightStyle> for Style {
    fn from(style: HighlightStyle) -> Self {
        let mut out = Style::default();
        if let Some(color) = style.text_color {
            out = out.fg(color);
        }
        if style.bold {
            out = out.add_modifier(Modifier::BOLD);
        }
        out
    }
}

pub fn token_style(token: &Token<'_>, highlighters: &HighlighterSet) -> Style {
    token
        .name
        .and_then(|name| highlighters.style_of(name))
        .map(Style::from)
        .unwrap_or_default()
}

pub fn styled_spans(tokens: &[Token<'_>], highlighters: &HighlighterSet) -> Vec<Span<'static>> {
    tokens
        .iter()
        .map(|t| Span::styled(t.text.to_string(), token_style(t, highlighters)))
        .collect()
}
