use fancy_regex::Regex;
use ratatui::style::Color;

/// Presentation attached to a named highlighter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HighlightStyle {
    pub text_color: Option<Color>,
    pub bold: bool,
}

#[derive(Clone, Debug)]
pub struct Highlighter {
    pub name: String,
    pub pattern: Regex,
    pub style: HighlightStyle,
}

/// Named highlighters, applied in insertion order.
///
/// Re-inserting an existing name replaces the pattern and style but keeps
/// the original position.
#[derive(Clone, Debug, Default)]
pub struct HighlighterSet {
    entries: Vec<Highlighter>,
}

impl HighlighterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, pattern: Regex, style: HighlightStyle) {
        let name = name.into();
        if let Some(existing) = self.entries.iter_mut().find(|h| h.name == name) {
            existing.pattern = pattern;
            existing.style = style;
            return;
        }
        self.entries.push(Highlighter {
            name,
            pattern,
            style,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Highlighter> {
        self.entries.iter()
    }

    pub fn style_of(&self, name: &str) -> Option<HighlightStyle> {
        self.entries.iter().find(|h| h.name == name).map(|h| h.style)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A fragment of one line. `name` is set iff a highlighter claimed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub name: Option<&'a str>,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    pub fn plain(text: &'a str) -> Self {
        Self { name: None, text }
    }

    pub fn named(name: &'a str, text: &'a str) -> Self {
        Self {
            name: Some(name),
            text,
        }
    }
}

/// Split a line into plain and named tokens.
///
/// Each highlighter gets one pass over the fragments that are still plain
/// at the start of that pass, and claims only its first match within each
/// of them. Fragments split off during a pass are left for the following
/// highlighters, so a second occurrence of the same pattern in one
/// fragment stays plain.
pub fn parse_line<'a>(text: &'a str, highlighters: &'a HighlighterSet) -> Vec<Token<'a>> {
    let mut tokens = vec![Token::plain(text)];

    for highlighter in highlighters.iter() {
        let mut next = Vec::with_capacity(tokens.len() + 2);
        for token in tokens {
            if token.name.is_some() {
                next.push(token);
                continue;
            }
            match first_match(&highlighter.pattern, token.text) {
                Some((start, end)) => {
                    if start > 0 {
                        next.push(Token::plain(&token.text[..start]));
                    }
                    next.push(Token::named(&highlighter.name, &token.text[start..end]));
                    if end < token.text.len() {
                        next.push(Token::plain(&token.text[end..]));
                    }
                }
                None => next.push(token),
            }
        }
        tokens = next;
    }

    tokens
}

fn first_match(pattern: &Regex, hay: &str) -> Option<(usize, usize)> {
    match pattern.find(hay) {
        Ok(Some(m)) if m.end() > m.start() => Some((m.start(), m.end())),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(pattern = pattern.as_str(), error = %e, "highlighter failed on fragment");
            None
        }
    }
}
