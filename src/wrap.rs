use crate::core::{LogDocument, Token};

/// One display row: a byte range of a physical line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WrappedRow {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

/// Display rows for a whole document at one width.
#[derive(Clone, Debug)]
pub struct WrappedLayout {
    width: usize,
    rows: Vec<WrappedRow>,
    first_row_of_line: Vec<usize>,
}

impl WrappedLayout {
    pub fn build(document: &LogDocument, width: usize) -> Self {
        let mut rows = Vec::with_capacity(document.line_count());
        let mut first_row_of_line = Vec::with_capacity(document.line_count() + 1);
        for line in 0..document.line_count() {
            first_row_of_line.push(rows.len());
            let tokens = document.tokenize_line(line);
            rows.extend(
                wrap_tokens(&tokens, width)
                    .into_iter()
                    .map(|(start, end)| WrappedRow { line, start, end }),
            );
        }
        first_row_of_line.push(rows.len());
        Self {
            width,
            rows,
            first_row_of_line,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<WrappedRow> {
        self.rows.get(index).copied()
    }

    pub fn first_row_of_line(&self, line: usize) -> usize {
        let last = self.first_row_of_line.len().saturating_sub(1);
        self.first_row_of_line[line.min(last)]
    }
}

struct RowBuilder {
    width: usize,
    rows: Vec<(usize, usize)>,
    row_start: usize,
    row_width: usize,
}

impl RowBuilder {
    fn break_at(&mut self, pos: usize) {
        self.rows.push((self.row_start, pos));
        self.row_start = pos;
        self.row_width = 0;
    }

    fn place_named(&mut self, text: &str, offset: usize) {
        let w = text.chars().count();
        if self.row_width > 0 && self.row_width + w > self.width {
            self.break_at(offset);
        }
        self.row_width += w;
    }

    fn place_plain(&mut self, text: &str, offset: usize) {
        for (rel, piece) in pieces(text) {
            let mut piece = piece;
            let mut piece_start = offset + rel;
            loop {
                let visible = piece.trim_end().chars().count();
                if self.row_width > 0 && self.row_width + visible > self.width {
                    self.break_at(piece_start);
                }
                if self.row_width == 0 && visible > self.width {
                    let cut = piece
                        .char_indices()
                        .nth(self.width)
                        .map(|(i, _)| i)
                        .unwrap_or(piece.len());
                    self.row_width = self.width;
                    self.break_at(piece_start + cut);
                    piece = &piece[cut..];
                    piece_start += cut;
                    continue;
                }
                self.row_width += piece.chars().count();
                break;
            }
        }
    }
}

/// Words with their trailing whitespace, as `(offset, text)`.
fn pieces(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev_ws = false;
    for (i, c) in text.char_indices() {
        if prev_ws && !c.is_whitespace() {
            out.push((start, &text[start..i]));
            start = i;
        }
        prev_ws = c.is_whitespace();
    }
    if start < text.len() {
        out.push((start, &text[start..]));
    }
    out
}

/// Byte ranges of the display rows of one tokenized line.
///
/// Named tokens are never split; a named token wider than `width` gets a
/// row of its own. Plain text breaks after whitespace, and words longer
/// than `width` are cut.
pub fn wrap_tokens(tokens: &[Token<'_>], width: usize) -> Vec<(usize, usize)> {
    let total: usize = tokens.iter().map(|t| t.text.len()).sum();
    if width == 0 {
        return vec![(0, total)];
    }

    let mut builder = RowBuilder {
        width,
        rows: Vec::new(),
        row_start: 0,
        row_width: 0,
    };
    let mut offset = 0;
    for token in tokens {
        if token.name.is_some() {
            builder.place_named(token.text, offset);
        } else {
            builder.place_plain(token.text, offset);
        }
        offset += token.text.len();
    }
    if builder.row_start < total || builder.rows.is_empty() {
        builder.rows.push((builder.row_start, total));
    }
    builder.rows
}

/// The parts of `tokens` that fall within `[start, end)` of the line.
pub fn tokens_in_range<'a>(tokens: &[Token<'a>], start: usize, end: usize) -> Vec<Token<'a>> {
    let mut out = Vec::new();
    let mut offset = 0;
    for token in tokens {
        let t_start = offset;
        let t_end = offset + token.text.len();
        offset = t_end;
        if t_end <= start || t_start >= end {
            continue;
        }
        let from = start.max(t_start) - t_start;
        let to = end.min(t_end) - t_start;
        out.push(Token {
            name: token.name,
            text: &token.text[from..to],
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn slices<'a>(line: &'a str, rows: &[(usize, usize)]) -> Vec<&'a str> {
        rows.iter().map(|&(s, e)| &line[s..e]).collect()
    }

    #[test]
    fn test_short_line_is_one_row() {
        let tokens = [Token::plain("hello world")];
        assert_eq!(wrap_tokens(&tokens, 80), vec![(0, 11)]);
    }

    #[test]
    fn test_empty_line_is_one_row() {
        let tokens = [Token::plain("")];
        assert_eq!(wrap_tokens(&tokens, 10), vec![(0, 0)]);
    }

    #[test]
    fn test_plain_text_breaks_after_whitespace() {
        let line = "alpha beta gamma delta";
        let rows = wrap_tokens(&[Token::plain(line)], 11);
        assert_eq!(slices(line, &rows), vec!["alpha beta ", "gamma delta"]);
    }

    #[test]
    fn test_long_word_is_cut() {
        let line = "abcdefghij";
        let rows = wrap_tokens(&[Token::plain(line)], 4);
        assert_eq!(slices(line, &rows), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_named_token_is_never_split() {
        let tokens = [
            Token::plain("at "),
            Token::named("timestamp", "2024-01-01 10:00:00,000"),
            Token::plain(" ok"),
        ];
        let line: String = tokens.iter().map(|t| t.text).collect();
        let rows = wrap_tokens(&tokens, 10);
        let parts = slices(&line, &rows);
        assert_eq!(parts, vec!["at ", "2024-01-01 10:00:00,000", " ok"]);
        for &(s, e) in &rows {
            for piece in tokens_in_range(&tokens, s, e) {
                if piece.name.is_some() {
                    assert_eq!(piece.text, "2024-01-01 10:00:00,000");
                }
            }
        }
    }

    #[test]
    fn test_tokens_in_range_slices_plain_tokens() {
        let tokens = [Token::plain("ab "), Token::named("lvl", "INFO"), Token::plain(" cd")];
        assert_eq!(
            tokens_in_range(&tokens, 1, 9),
            vec![Token::plain("b "), Token::named("lvl", "INFO"), Token::plain(" c")]
        );
    }
}
