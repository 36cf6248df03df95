//! Windowed rendering of a [`LogDocument`].
//!
//! Only the rows around the visible area are materialized. Everything is
//! positioned on an absolute axis where row `r` sits at `r * line_height`,
//! so the scrollable height always reflects the whole document.

use crate::constants::SMOOTH_SCROLL_EASING;
use crate::core::{LogDocument, Token};
use crate::error::NavigationError;
use crate::wrap::{tokens_in_range, WrappedLayout};
use std::sync::Arc;

/// Row range to materialize for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowRange {
    pub closest_row_to_top: usize,
    pub start: usize,
    pub end: usize,
}

/// `[closest - margin, closest + visible + margin)` clamped to the document.
pub fn window_range(
    scroll_offset: f64,
    line_height: f64,
    viewport_height: f64,
    margin: usize,
    total_rows: usize,
) -> WindowRange {
    let line_height = if line_height > 0.0 { line_height } else { 1.0 };
    let closest_row_to_top = (scroll_offset.max(0.0) / line_height).floor() as usize;
    let visible_rows = (viewport_height.max(0.0) / line_height).ceil() as usize;
    let end = closest_row_to_top
        .saturating_add(visible_rows)
        .saturating_add(margin)
        .min(total_rows);
    let start = closest_row_to_top.saturating_sub(margin).min(end);
    WindowRange {
        closest_row_to_top,
        start,
        end,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedRow<'a> {
    pub line: usize,
    pub row: usize,
    /// Set for the second and later rows of a wrapped line.
    pub continuation: bool,
    pub tokens: Vec<Token<'a>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderedMessage<'a> {
    pub message_num: usize,
    /// Position of the message's first row, which may lie above the window.
    pub top: f64,
    pub rows: Vec<RenderedRow<'a>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderWindow<'a> {
    pub range: WindowRange,
    pub line_height: f64,
    pub scroll_offset: f64,
    pub total_height: f64,
    pub messages: Vec<RenderedMessage<'a>>,
}

impl RenderWindow<'_> {
    pub fn row_count(&self) -> usize {
        self.messages.iter().map(|m| m.rows.len()).sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ScrollAnimation {
    message_num: usize,
}

pub struct Viewport {
    document: Option<Arc<LogDocument>>,
    scroll_offset: f64,
    line_height: f64,
    viewport_width: usize,
    viewport_height: f64,
    margin: usize,
    wrap_lines: bool,
    wrapped: Option<WrappedLayout>,
    animation: Option<ScrollAnimation>,
}

impl Viewport {
    pub fn new(line_height: f64, margin: usize) -> Self {
        Self {
            document: None,
            scroll_offset: 0.0,
            line_height: if line_height > 0.0 { line_height } else { 1.0 },
            viewport_width: 0,
            viewport_height: 0.0,
            margin,
            wrap_lines: false,
            wrapped: None,
            animation: None,
        }
    }

    /// Replace the content. Cached layout is dropped and scrolling restarts
    /// at the top.
    pub fn set_value(&mut self, document: Arc<LogDocument>) {
        self.document = Some(document);
        self.wrapped = None;
        self.animation = None;
        self.scroll_offset = 0.0;
    }

    pub fn document(&self) -> Option<&Arc<LogDocument>> {
        self.document.as_ref()
    }

    pub fn resize(&mut self, width: usize, height: f64) {
        if width != self.viewport_width {
            self.wrapped = None;
        }
        self.viewport_width = width;
        self.viewport_height = height.max(0.0);
        self.scroll_offset = self.clamp_offset(self.scroll_offset);
    }

    pub fn set_wrap_lines(&mut self, wrap: bool) {
        if wrap != self.wrap_lines {
            self.wrap_lines = wrap;
            self.wrapped = None;
            self.scroll_offset = self.clamp_offset(self.scroll_offset);
        }
    }

    pub fn wrap_lines(&self) -> bool {
        self.wrap_lines
    }

    pub fn line_height(&self) -> f64 {
        self.line_height
    }

    #[cfg(test)]
    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    fn uses_wrap_layout(&self) -> bool {
        self.wrap_lines && self.viewport_width > 0
    }

    fn total_rows(&self) -> usize {
        match (&self.wrapped, &self.document) {
            (Some(layout), _) if self.uses_wrap_layout() => layout.row_count(),
            (_, Some(doc)) => doc.line_count(),
            (_, None) => 0,
        }
    }

    fn first_row_of_line(&self, line: usize) -> usize {
        match &self.wrapped {
            Some(layout) if self.uses_wrap_layout() => layout.first_row_of_line(line),
            _ => line,
        }
    }

    pub fn total_height(&self) -> f64 {
        self.total_rows() as f64 * self.line_height
    }

    pub fn max_scroll(&self) -> f64 {
        (self.total_height() - self.viewport_height).max(0.0)
    }

    fn clamp_offset(&self, offset: f64) -> f64 {
        if offset.is_nan() {
            return 0.0;
        }
        offset.clamp(0.0, self.max_scroll())
    }

    pub fn set_scroll_offset(&mut self, offset: f64) {
        self.animation = None;
        self.scroll_offset = self.clamp_offset(offset);
    }

    pub fn scroll_by(&mut self, delta: f64) {
        self.set_scroll_offset(self.scroll_offset + delta);
    }

    pub fn scroll_rows(&mut self, rows: i64) {
        self.scroll_by(rows as f64 * self.line_height);
    }

    pub fn scroll_to_start(&mut self) {
        self.set_scroll_offset(0.0);
    }

    pub fn scroll_to_end(&mut self) {
        self.set_scroll_offset(self.max_scroll());
    }

    /// Start a smooth scroll to the first row of message `message_num`.
    pub fn scroll_to_message(&mut self, message_num: usize) -> Result<(), NavigationError> {
        let Some(target) = self.message_target(message_num) else {
            return Err(NavigationError::MessageOutOfRange {
                requested: message_num,
                count: self.document.as_ref().map_or(0, |d| d.message_count()),
            });
        };
        self.animation = Some(ScrollAnimation { message_num });
        tracing::debug!(message_num, target, "scrolling to message");
        Ok(())
    }

    /// Clamped offset of a message's first row under the current size and
    /// wrap mode.
    fn message_target(&mut self, message_num: usize) -> Option<f64> {
        let line_start = self
            .document
            .as_ref()
            .and_then(|d| d.boundaries().get(message_num))?
            .line_start;
        self.refresh_layout();
        let target = self.first_row_of_line(line_start) as f64 * self.line_height;
        Some(self.clamp_offset(target))
    }

    /// Advance a running smooth scroll by one frame. Returns whether the
    /// animation is still in progress.
    pub fn tick(&mut self) -> bool {
        let Some(animation) = self.animation else {
            return false;
        };
        // Resizes and wrap toggles move the target, so it is recomputed.
        let Some(target) = self.message_target(animation.message_num) else {
            self.animation = None;
            return false;
        };
        let distance = target - self.scroll_offset;
        if distance.abs() <= self.line_height * 0.5 {
            self.scroll_offset = target;
            self.animation = None;
            return false;
        }
        self.scroll_offset = self.clamp_offset(self.scroll_offset + distance * SMOOTH_SCROLL_EASING);
        true
    }

    pub fn finish_animation(&mut self) {
        if let Some(animation) = self.animation.take() {
            if let Some(target) = self.message_target(animation.message_num) {
                self.scroll_offset = target;
            }
        }
    }

    fn refresh_layout(&mut self) {
        if !self.uses_wrap_layout() {
            return;
        }
        let stale = self
            .wrapped
            .as_ref()
            .map_or(true, |l| l.width() != self.viewport_width);
        if stale {
            if let Some(doc) = &self.document {
                self.wrapped = Some(WrappedLayout::build(doc, self.viewport_width));
                tracing::debug!(width = self.viewport_width, "rebuilt wrapped layout");
            }
        }
    }

    pub fn closest_line_to_top(&self) -> usize {
        let row = (self.scroll_offset / self.line_height).floor() as usize;
        match &self.wrapped {
            Some(layout) if self.uses_wrap_layout() => layout.row(row).map_or(0, |r| r.line),
            _ => row,
        }
    }

    /// Materialize the rows around the current scroll position, grouped
    /// by message. Cost depends on the window size, not the document size.
    pub fn render(&mut self) -> RenderWindow<'_> {
        self.refresh_layout();
        self.scroll_offset = self.clamp_offset(self.scroll_offset);

        let range = window_range(
            self.scroll_offset,
            self.line_height,
            self.viewport_height,
            self.margin,
            self.total_rows(),
        );
        let mut window = RenderWindow {
            range,
            line_height: self.line_height,
            scroll_offset: self.scroll_offset,
            total_height: self.total_height(),
            messages: Vec::new(),
        };
        let Some(doc) = self.document.as_deref() else {
            return window;
        };
        let layout = self.wrapped.as_ref().filter(|_| self.uses_wrap_layout());

        let mut line_tokens: Option<(usize, Vec<Token<'_>>)> = None;
        for row in range.start..range.end {
            let (line, start, end) = match layout.and_then(|l| l.row(row)) {
                Some(r) => (r.line, r.start, r.end),
                None => (row, 0, doc.line_text(row).len()),
            };
            if line_tokens.as_ref().map_or(true, |(cached, _)| *cached != line) {
                line_tokens = Some((line, doc.tokenize_line(line)));
            }
            let Some((_, tokens)) = &line_tokens else {
                continue;
            };
            let continuation = start > 0;
            let rendered = RenderedRow {
                line,
                row,
                continuation,
                tokens: if layout.is_some() {
                    tokens_in_range(tokens, start, end)
                } else {
                    tokens.clone()
                },
            };

            let message_num = doc.message_index_of_line(line);
            match window.messages.last_mut() {
                Some(m) if m.message_num == message_num => m.rows.push(rendered),
                _ => {
                    let line_start = doc.boundaries()[message_num].line_start;
                    let top = match layout {
                        Some(l) => l.first_row_of_line(line_start),
                        None => line_start,
                    } as f64
                        * self.line_height;
                    window.messages.push(RenderedMessage {
                        message_num,
                        top,
                        rows: vec![rendered],
                    });
                }
            }
        }

        tracing::trace!(
            start = range.start,
            end = range.end,
            messages = window.messages.len(),
            rows = window.row_count(),
            "rendered window"
        );
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MESSAGE_START_PATTERN;
    use crate::core::{HighlightStyle, HighlighterSet, PatternConfig};
    use fancy_regex::Regex;
    use pretty_assertions::assert_eq;

    const LINE_HEIGHT: f64 = 20.0;
    const MARGIN: usize = 20;

    fn document(messages: usize, lines_per_message: usize) -> Arc<LogDocument> {
        let mut text = String::new();
        for m in 0..messages {
            text.push_str(&format!("2024-01-01 10:00:00,{:03} INFO message {}\n", m % 1000, m));
            for l in 1..lines_per_message {
                text.push_str(&format!("  detail {}\n", l));
            }
        }
        text.pop();
        let mut highlighters = HighlighterSet::new();
        highlighters.insert(
            "level",
            Regex::new(r"\bINFO\b").unwrap(),
            HighlightStyle::default(),
        );
        let config = PatternConfig::new(DEFAULT_MESSAGE_START_PATTERN, highlighters).unwrap();
        Arc::new(LogDocument::parse(text, &config).unwrap())
    }

    fn viewport(doc: Arc<LogDocument>, height: f64) -> Viewport {
        let mut v = Viewport::new(LINE_HEIGHT, MARGIN);
        v.set_value(doc);
        v.resize(80, height);
        v
    }

    #[test]
    fn test_window_range_at_top() {
        let r = window_range(0.0, LINE_HEIGHT, 200.0, MARGIN, 1000);
        assert_eq!(
            r,
            WindowRange {
                closest_row_to_top: 0,
                start: 0,
                end: 30
            }
        );
    }

    #[test]
    fn test_window_range_in_middle_and_at_end() {
        let r = window_range(5010.0, LINE_HEIGHT, 200.0, MARGIN, 1000);
        assert_eq!((r.closest_row_to_top, r.start, r.end), (250, 230, 280));
        let r = window_range(19_990.0, LINE_HEIGHT, 200.0, MARGIN, 1000);
        assert_eq!((r.start, r.end), (979, 1000));
    }

    #[test]
    fn test_window_is_bounded_and_contains_top_row() {
        for total in [0usize, 1, 7, 100, 100_000] {
            for scroll in [0.0, 13.0, 399.0, 1_000.0, 1_999_990.0] {
                for height in [0.0, 19.0, 200.0, 1_000.0] {
                    let r = window_range(scroll, LINE_HEIGHT, height, MARGIN, total);
                    let visible = (height / LINE_HEIGHT).ceil() as usize;
                    assert!(r.end - r.start <= visible + 2 * MARGIN);
                    assert!(r.start <= r.end && r.end <= total);
                    if r.closest_row_to_top < total {
                        assert!((r.start..r.end).contains(&r.closest_row_to_top));
                    }
                }
            }
        }
    }

    #[test]
    fn test_render_groups_rows_by_message() {
        let mut v = viewport(document(100, 3), 200.0);
        v.set_scroll_offset(30.0 * LINE_HEIGHT);
        let window = v.render();
        assert_eq!(window.total_height, 300.0 * LINE_HEIGHT);
        assert_eq!((window.range.start, window.range.end), (10, 60));
        let first = &window.messages[0];
        assert_eq!(first.message_num, 3);
        assert_eq!(first.top, 9.0 * LINE_HEIGHT);
        assert_eq!(first.rows.len(), 2);
        assert_eq!(first.rows[0].line, 10);
        assert_eq!(window.row_count(), 50);
        let nums: Vec<usize> = window.messages.iter().map(|m| m.message_num).collect();
        assert_eq!(nums, (3..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_rendered_rows_carry_tokens() {
        let mut v = viewport(document(2, 1), 200.0);
        let window = v.render();
        let tokens = &window.messages[0].rows[0].tokens;
        assert!(tokens.iter().any(|t| t.name == Some("level") && t.text == "INFO"));
    }

    #[test]
    fn test_render_cost_independent_of_document_size() {
        let mut v = viewport(document(20_000, 5), 400.0);
        v.set_scroll_offset(50_000.0 * LINE_HEIGHT);
        let window = v.render();
        assert!(window.row_count() <= 20 + 2 * MARGIN);
    }

    #[test]
    fn test_scroll_to_message_eases_to_target() {
        let mut v = viewport(document(100, 3), 200.0);
        v.scroll_to_message(10).unwrap();
        assert!(v.is_animating());
        let mut frames = 0;
        while v.tick() {
            frames += 1;
            assert!(frames < 100);
        }
        assert!(frames > 1);
        assert_eq!(v.scroll_offset(), 30.0 * LINE_HEIGHT);
        assert_eq!(v.closest_line_to_top(), 30);
    }

    #[test]
    fn test_scroll_to_message_out_of_range_does_not_scroll() {
        let mut v = viewport(document(5, 2), 40.0);
        v.set_scroll_offset(60.0);
        let err = v.scroll_to_message(5).unwrap_err();
        assert_eq!(
            err,
            NavigationError::MessageOutOfRange {
                requested: 5,
                count: 5
            }
        );
        assert!(!v.is_animating());
        assert_eq!(v.scroll_offset(), 60.0);
    }

    #[test]
    fn test_scroll_to_message_without_document() {
        let mut v = Viewport::new(LINE_HEIGHT, MARGIN);
        assert!(v.scroll_to_message(0).is_err());
    }

    #[test]
    fn test_scroll_target_is_clamped_near_end() {
        let mut v = viewport(document(10, 1), 100.0);
        v.scroll_to_message(9).unwrap();
        v.finish_animation();
        assert_eq!(v.scroll_offset(), v.max_scroll());
        assert_eq!(v.max_scroll(), 100.0);
    }

    #[test]
    fn test_user_scroll_cancels_animation() {
        let mut v = viewport(document(100, 1), 100.0);
        v.scroll_to_message(50).unwrap();
        v.scroll_rows(1);
        assert!(!v.is_animating());
        assert_eq!(v.scroll_offset(), LINE_HEIGHT);
    }

    #[test]
    fn test_resize_and_stale_scroll_are_clamped() {
        let mut v = viewport(document(10, 1), 100.0);
        v.scroll_to_end();
        assert_eq!(v.scroll_offset(), 100.0);
        v.resize(80, 1_000.0);
        assert_eq!(v.scroll_offset(), 0.0);
        let window = v.render();
        assert_eq!((window.range.start, window.range.end), (0, 10));
    }

    #[test]
    fn test_growing_viewport_mid_scroll_still_settles() {
        let mut v = viewport(document(100, 1), 100.0);
        v.scroll_to_message(90).unwrap();
        v.tick();
        v.resize(80, 600.0);
        let mut frames = 0;
        while v.tick() {
            v.render();
            frames += 1;
            assert!(frames < 100, "scroll never settled");
        }
        assert!(!v.is_animating());
        assert_eq!(v.max_scroll(), 1_400.0);
        assert_eq!(v.scroll_offset(), v.max_scroll());
    }

    #[test]
    fn test_wrap_toggle_mid_scroll_retargets_message() {
        let mut v = viewport(document(100, 3), 200.0);
        v.scroll_to_message(10).unwrap();
        v.tick();
        v.resize(20, 200.0);
        v.set_wrap_lines(true);
        let mut frames = 0;
        while v.tick() {
            frames += 1;
            assert!(frames < 100, "scroll never settled");
        }
        assert!(v.wrap_lines());
        assert_eq!(v.closest_line_to_top(), 30);
    }

    #[test]
    fn test_wrapped_rows_map_messages_to_wrapped_positions() {
        let mut v = viewport(document(3, 1), 200.0);
        v.resize(20, 200.0);
        v.set_wrap_lines(true);
        let window = v.render();
        // "2024-01-01 | 10:00:00,000 INFO | message 0"
        assert_eq!(window.total_height, 9.0 * LINE_HEIGHT);
        assert_eq!(window.messages[1].top, 3.0 * LINE_HEIGHT);
        assert_eq!(window.messages[0].rows.len(), 3);
        assert!(window.messages[0].rows[1].continuation);
        v.scroll_to_message(2).unwrap();
        v.finish_animation();
        assert_eq!(v.scroll_offset(), 0.0);
    }
}
