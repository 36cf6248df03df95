use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Container an audit draws the details of one result into.
#[derive(Clone, Debug, Default)]
pub struct DetailPanel {
    title: String,
    lines: Vec<Line<'static>>,
}

impl DetailPanel {
    pub fn clear(&mut self) {
        self.title.clear();
        self.lines.clear();
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn field(&mut self, label: &str, value: &str) {
        self.lines.push(Line::from(vec![
            Span::styled(
                format!("{}: ", label),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(value.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        ]));
    }

    pub fn text_block(&mut self, text: &str) {
        self.lines
            .extend(text.lines().map(|l| Line::from(l.to_string())));
    }

    pub fn code_block(&mut self, lines: Vec<Line<'static>>) {
        self.lines.extend(lines);
    }

    pub fn blank(&mut self) {
        self.lines.push(Line::default());
    }

    pub fn lines(&self) -> &[Line<'static>] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Unstyled content, one line per row.
    #[cfg(test)]
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
