use crate::audit::{AuditRegistry, AuditResult};
use crate::config::ViewConfig;
use crate::constants::TERMINAL_LINE_HEIGHT;
use crate::core::PatternConfig;
use crate::detail::DetailPanel;
use crate::input::{InputAction, PatternInput};
use crate::results::{Column, ResultList, SortState};
use crate::source::{spawn_analysis, SourceEvent};
use crate::viewport::Viewport;
use crossterm::event::KeyCode;
use ratatui::layout::Rect;
use ratatui::widgets::TableState;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

const WHEEL_ROWS: i64 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    LineStartEdit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Log,
    Results,
}

/// Screen areas from the last frame, used to route mouse events.
#[derive(Clone, Debug, Default)]
pub struct LayoutAreas {
    pub input: Rect,
    pub log: Rect,
    pub results: Rect,
    pub results_body: Rect,
    pub result_columns: Vec<(Column, Rect)>,
    pub detail: Rect,
}

pub struct App {
    pub viewport: Viewport,
    pub results: ResultList,
    pub results_state: TableState,
    pub detail: DetailPanel,
    pub detail_scroll: u16,
    pub line_start: PatternInput,
    pub input_mode: InputMode,
    pub focus: Focus,
    pub status_message: Option<String>,
    pub source_label: String,
    pub areas: LayoutAreas,
    pub analyzing: bool,
    pub last_elapsed: Option<Duration>,
    patterns: PatternConfig,
    /// Submitted start pattern that has not yet produced an analysis.
    pending_patterns: Option<PatternConfig>,
    registry: Arc<AuditRegistry>,
    text: Option<Arc<str>>,
    generation: u64,
    source_tx: Sender<SourceEvent>,
    source_rx: Receiver<SourceEvent>,
    selection_rx: Receiver<(Arc<AuditResult>, usize)>,
}

impl App {
    pub fn new(
        config: &ViewConfig,
        patterns: PatternConfig,
        sort: SortState,
        source_label: String,
        source_tx: Sender<SourceEvent>,
        source_rx: Receiver<SourceEvent>,
    ) -> Self {
        let mut viewport = Viewport::new(TERMINAL_LINE_HEIGHT, config.render_margin);
        viewport.set_wrap_lines(config.wrap_lines);

        let (selection_tx, selection_rx) = mpsc::channel();
        let mut results = ResultList::new();
        results.sort_by(sort.column, sort.desc);
        results.set_on_select(Box::new(move |result, message_num| {
            let _ = selection_tx.send((Arc::clone(result), message_num));
        }));

        Self {
            viewport,
            results,
            results_state: TableState::default(),
            detail: DetailPanel::default(),
            detail_scroll: 0,
            line_start: PatternInput::new(patterns.message_start_source()),
            input_mode: InputMode::Normal,
            focus: Focus::Log,
            status_message: None,
            source_label,
            areas: LayoutAreas::default(),
            analyzing: false,
            last_elapsed: None,
            patterns,
            pending_patterns: None,
            registry: Arc::new(AuditRegistry::default()),
            text: None,
            generation: 0,
            source_tx,
            source_rx,
            selection_rx,
        }
    }

    pub fn poll_source(&mut self) {
        while let Ok(event) = self.source_rx.try_recv() {
            match event {
                SourceEvent::Loaded(text) => {
                    self.text = Some(text);
                    self.reanalyze();
                }
                SourceEvent::Analyzed {
                    generation,
                    analysis,
                } if generation == self.generation => {
                    self.analyzing = false;
                    if let Some(patterns) = self.pending_patterns.take() {
                        self.patterns = patterns;
                        self.line_start.commit();
                    }
                    self.last_elapsed = Some(analysis.elapsed);
                    self.viewport.set_value(analysis.document);
                    self.results.set_results(analysis.results);
                    self.detail.clear();
                    self.detail_scroll = 0;
                    self.line_start.clear_error();
                }
                SourceEvent::Rejected { generation, error } if generation == self.generation => {
                    self.analyzing = false;
                    if self.pending_patterns.take().is_some() {
                        self.input_mode = InputMode::LineStartEdit;
                    }
                    self.line_start.set_error(error.to_string());
                    self.status_message = Some(format!("Analysis rejected: {}", error));
                }
                SourceEvent::Analyzed { generation, .. }
                | SourceEvent::Rejected { generation, .. } => {
                    tracing::debug!(generation, current = self.generation, "dropping stale analysis");
                }
                SourceEvent::Error(e) => {
                    self.status_message = Some(format!("Source error: {}", e));
                }
            }
        }
    }

    /// Apply selections made in the result list: scroll the log to the
    /// message and show the audit's details.
    pub fn poll_selection(&mut self) {
        while let Ok((result, message_num)) = self.selection_rx.try_recv() {
            if let Err(e) = self.viewport.scroll_to_message(message_num) {
                tracing::warn!(error = %e, "selected result points outside the document");
                self.status_message = Some(e.to_string());
            }
            self.registry.render_detail(&result, &mut self.detail);
            self.detail_scroll = 0;
        }
    }

    fn reanalyze(&mut self) {
        let Some(text) = &self.text else {
            return;
        };
        self.generation += 1;
        self.analyzing = true;
        let patterns = self.pending_patterns.as_ref().unwrap_or(&self.patterns);
        spawn_analysis(
            Arc::clone(text),
            patterns.clone(),
            Arc::clone(&self.registry),
            self.generation,
            self.source_tx.clone(),
        );
    }

    pub fn start_line_start_edit(&mut self) {
        self.input_mode = InputMode::LineStartEdit;
    }

    pub fn handle_input_key(&mut self, code: KeyCode) {
        match self.line_start.handle_key(code) {
            InputAction::Submit => self.apply_line_start(),
            InputAction::Cancel => {
                self.line_start.revert();
                self.line_start.clear_error();
                self.input_mode = InputMode::Normal;
            }
            InputAction::Edited | InputAction::Ignored => {}
        }
    }

    /// Compile the edited pattern and re-run the analysis with it. The
    /// pattern is only committed once an analysis with it succeeds; until
    /// then the current document and pattern stay in place.
    pub fn apply_line_start(&mut self) {
        match PatternConfig::new(self.line_start.text(), self.patterns.highlighters().clone()) {
            Ok(patterns) => {
                tracing::info!(pattern = %self.line_start.text(), "trying message start pattern");
                self.pending_patterns = Some(patterns);
                self.line_start.clear_error();
                self.input_mode = InputMode::Normal;
                self.reanalyze();
            }
            Err(e) => self.line_start.set_error(e.to_string()),
        }
    }

    pub fn toggle_wrap(&mut self) {
        let wrap = !self.viewport.wrap_lines();
        self.viewport.set_wrap_lines(wrap);
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Log => Focus::Results,
            Focus::Results => Focus::Log,
        };
    }

    pub fn page_rows(&self) -> i64 {
        (self.viewport.viewport_height() / self.viewport.line_height()).max(1.0) as i64
    }

    pub fn sort_by_column(&mut self, column: Column) {
        self.results.on_header_click(column);
    }

    pub fn move_result_cursor(&mut self, delta: i64) {
        self.results.move_cursor(delta);
    }

    pub fn select_result_at_cursor(&mut self) {
        if let Err(e) = self.results.select_cursor() {
            self.status_message = Some(e.to_string());
        }
    }

    pub fn scroll_detail(&mut self, delta: i32) {
        self.detail_scroll = (self.detail_scroll as i32 + delta).max(0) as u16;
    }

    pub fn on_click(&mut self, column: u16, row: u16) {
        let hit = |area: Rect| area.contains((column, row).into());
        let header = self
            .areas
            .result_columns
            .iter()
            .find(|(_, area)| hit(*area))
            .map(|(col, _)| *col);
        if let Some(col) = header {
            self.focus = Focus::Results;
            self.sort_by_column(col);
        } else if hit(self.areas.results_body) {
            self.focus = Focus::Results;
            let index = self.results_state.offset() + (row - self.areas.results_body.y) as usize;
            if index < self.results.len() {
                self.results.move_cursor(index as i64 - self.results.cursor() as i64);
                self.select_result_at_cursor();
            }
        } else if hit(self.areas.log) {
            self.focus = Focus::Log;
        } else if hit(self.areas.input) {
            self.start_line_start_edit();
        }
    }

    pub fn on_wheel(&mut self, column: u16, row: u16, down: bool) {
        let position = (column, row).into();
        let delta = if down { WHEEL_ROWS } else { -WHEEL_ROWS };
        if self.areas.results.contains(position) {
            self.move_result_cursor(delta.signum());
        } else if self.areas.detail.contains(position) {
            self.scroll_detail(delta as i32);
        } else {
            self.viewport.scroll_rows(delta);
        }
    }

    /// Advance animations for this frame.
    pub fn tick(&mut self) {
        self.viewport.tick();
    }

    pub fn message_count(&self) -> usize {
        self.viewport.document().map_or(0, |d| d.message_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const LOG: &str = "\
2024-01-01 10:00:00,000 #1 INFO [R1] [S1] starting
2024-01-01 10:00:01,000 #1 ERROR [R1] [S1] Disk full
2024-01-01 10:00:02,000 #1 INFO [R1] [S1] done";

    fn app() -> App {
        let config = ViewConfig::default();
        let patterns = config.pattern_config().unwrap();
        let (tx, rx) = mpsc::channel();
        App::new(&config, patterns, SortState::default(), "test".to_string(), tx, rx)
    }

    fn wait_for_analysis(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.analyzing && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            app.poll_source();
        }
        assert!(!app.analyzing, "analysis did not finish");
    }

    fn load(app: &mut App, text: &str) {
        app.source_tx
            .send(SourceEvent::Loaded(Arc::from(text)))
            .unwrap();
        app.poll_source();
        wait_for_analysis(app);
    }

    #[test]
    fn test_loaded_text_is_analyzed() {
        let mut app = app();
        load(&mut app, LOG);
        assert_eq!(app.message_count(), 3);
        assert_eq!(app.results.len(), 1);
        assert!(app.line_start.error().is_none());
    }

    #[test]
    fn test_selection_scrolls_and_fills_detail() {
        let mut app = app();
        load(&mut app, LOG);
        app.viewport.resize(80, 1.0);
        app.select_result_at_cursor();
        app.poll_selection();
        assert_eq!(app.detail.title(), "Errors");
        app.viewport.finish_animation();
        assert_eq!(app.viewport.scroll_offset(), 1.0);
    }

    #[test]
    fn test_bad_start_pattern_keeps_document() {
        let mut app = app();
        load(&mut app, LOG);
        app.start_line_start_edit();
        app.handle_input_key(KeyCode::End);
        app.handle_input_key(KeyCode::Char('('));
        app.handle_input_key(KeyCode::Enter);
        assert!(app.line_start.error().is_some());
        assert_eq!(app.input_mode, InputMode::LineStartEdit);
        assert_eq!(app.message_count(), 3);

        app.handle_input_key(KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.line_start.error().is_none());
    }

    #[test]
    fn test_mismatching_start_pattern_is_reported_on_input() {
        let mut app = app();
        load(&mut app, LOG);
        app.start_line_start_edit();
        for _ in 0..100 {
            app.handle_input_key(KeyCode::Backspace);
        }
        for c in "INFO".chars() {
            app.handle_input_key(KeyCode::Char(c));
        }
        app.handle_input_key(KeyCode::Enter);
        wait_for_analysis(&mut app);
        assert!(app.line_start.error().is_some());
        assert_eq!(app.input_mode, InputMode::LineStartEdit);
        assert_eq!(app.message_count(), 3);
    }

    #[test]
    fn test_rejected_start_pattern_is_not_kept() {
        let mut app = app();
        load(&mut app, LOG);
        let original = app.line_start.text().to_string();
        app.start_line_start_edit();
        for _ in 0..100 {
            app.handle_input_key(KeyCode::Backspace);
        }
        for c in "INFO".chars() {
            app.handle_input_key(KeyCode::Char(c));
        }
        app.handle_input_key(KeyCode::Enter);
        wait_for_analysis(&mut app);
        assert!(app.line_start.error().is_some());

        app.handle_input_key(KeyCode::Esc);
        assert_eq!(app.line_start.text(), original);
        assert_eq!(app.patterns.message_start_source(), original);

        // A later reload still parses with the last accepted pattern.
        load(&mut app, LOG);
        assert!(app.line_start.error().is_none());
        assert_eq!(app.message_count(), 3);
    }

    #[test]
    fn test_accepted_start_pattern_is_committed() {
        let mut app = app();
        load(&mut app, LOG);
        app.start_line_start_edit();
        for _ in 0..100 {
            app.handle_input_key(KeyCode::Backspace);
        }
        for c in r"\d{4}-".chars() {
            app.handle_input_key(KeyCode::Char(c));
        }
        app.handle_input_key(KeyCode::Enter);
        wait_for_analysis(&mut app);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.patterns.message_start_source(), r"\d{4}-");
        assert!(app.line_start.error().is_none());
    }
}
