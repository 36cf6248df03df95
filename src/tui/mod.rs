use crate::app::{App, Focus, InputMode};
use crate::audit::Level;
use crate::constants::{
    HELP_POPUP_HEIGHT, HELP_POPUP_WIDTH, INPUT_FIELD_HEIGHT, LINE_NUMBER_WIDTH, STATUS_BAR_HEIGHT,
};
use crate::highlight::styled_spans;
use crate::input::PatternInput;
use crate::results::Column;
use ratatui::{
    layout::{Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Table, Wrap,
    },
    Frame,
};

const RESULT_WIDTHS: [Constraint; 4] = [
    Constraint::Length(9),
    Constraint::Length(25),
    Constraint::Length(16),
    Constraint::Min(10),
];

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(INPUT_FIELD_HEIGHT),
            Constraint::Percentage(60),
            Constraint::Min(6),
            Constraint::Length(STATUS_BAR_HEIGHT),
        ])
        .split(frame.area());
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[2]);

    app.areas.input = chunks[0];
    draw_pattern_input(
        frame,
        &app.line_start,
        chunks[0],
        " Message start (s) ",
        app.input_mode == InputMode::LineStartEdit,
    );
    draw_log_view(frame, app, chunks[1]);
    draw_results(frame, app, bottom[0]);
    draw_detail(frame, app, bottom[1]);
    draw_status_bar(frame, app, chunks[3]);

    if app.input_mode != InputMode::Normal {
        draw_help_popup(frame);
    }
}

fn draw_pattern_input(
    frame: &mut Frame,
    input: &PatternInput,
    area: Rect,
    label: &str,
    is_active: bool,
) {
    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let title = match input.error() {
        Some(err) => format!(" {} (Error: {}) ", label.trim(), err),
        None => label.to_string(),
    };

    let border_style = if input.error().is_some() {
        Style::default().fg(Color::Red)
    } else {
        style
    };

    let widget = Paragraph::new(input.text())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(border_style),
        )
        .style(style);
    frame.render_widget(widget, area);

    if is_active {
        frame.set_cursor_position((area.x + input.cursor() as u16 + 1, area.y + 1));
    }
}

fn draw_log_view(frame: &mut Frame, app: &mut App, area: Rect) {
    app.areas.log = area;
    let title = format!(
        " {} [{} messages] {}{}",
        app.source_label,
        app.message_count(),
        if app.viewport.wrap_lines() { "[WRAP] " } else { "" },
        if app.analyzing { "[ANALYZING] " } else { "" },
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(focus_style(app.focus == Focus::Log));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let content_width = (inner.width as usize).saturating_sub(LINE_NUMBER_WIDTH);
    let line_height = app.viewport.line_height();
    app.viewport.resize(content_width, inner.height as f64 * line_height);

    let Some(document) = app.viewport.document().cloned() else {
        let waiting = Paragraph::new("Loading...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(waiting, inner);
        return;
    };
    let selected_message = app.results.selected().map(|r| r.message_num);
    let height = inner.height as usize;
    let mut rows: Vec<Line> = vec![Line::default(); height];

    let window = app.viewport.render();
    let top_row = (window.scroll_offset / window.line_height).floor() as usize;
    let total_rows = (window.total_height / window.line_height) as usize;
    for message in &window.messages {
        let first_line = document
            .boundaries()
            .get(message.message_num)
            .map(|b| b.line_start);
        let marker_style = if selected_message == Some(message.message_num) {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else if message.message_num % 2 == 0 {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Blue)
        };

        for row in &message.rows {
            let Some(y) = row.row.checked_sub(top_row) else {
                continue;
            };
            if y >= height {
                continue;
            }
            let gutter = if row.continuation {
                Span::styled(format!("{:>6} ┆ ", ""), Style::default().fg(Color::DarkGray))
            } else if Some(row.line) == first_line {
                Span::styled(format!("{:>6} ┃ ", row.line + 1), marker_style)
            } else {
                Span::styled(
                    format!("{:>6} │ ", row.line + 1),
                    Style::default().fg(Color::DarkGray),
                )
            };
            let mut spans = vec![gutter];
            spans.extend(styled_spans(&row.tokens, document.highlighters()));
            rows[y] = Line::from(spans);
        }
    }
    drop(window);

    frame.render_widget(Paragraph::new(rows), inner);

    if total_rows > height {
        let mut state = ScrollbarState::new(total_rows.saturating_sub(height) + 1)
            .position(top_row)
            .viewport_content_length(height);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }
}

fn level_style(level: Level) -> Style {
    match level {
        Level::Severe => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        Level::Warning => Style::default().fg(Color::Yellow),
        Level::Info => Style::default().fg(Color::Green),
    }
}

fn draw_results(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Results [{}] ", app.results.len()))
        .border_style(focus_style(app.focus == Focus::Results));
    let inner = block.inner(area);

    let sort = app.results.sort_state();
    let header = Row::new(Column::ALL.iter().map(|column| {
        let arrow = match (sort.column == *column, sort.desc) {
            (true, false) => " ▲",
            (true, true) => " ▼",
            (false, _) => "",
        };
        Cell::from(format!("{}{}", column.title(), arrow))
    }))
    .style(Style::default().add_modifier(Modifier::BOLD));

    let selected_row = app.results.selected_row();
    let rows: Vec<Row> = app
        .results
        .results()
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let level = result.result_level.level;
            let row = Row::new(vec![
                Cell::from(Span::styled(level.as_str(), level_style(level))),
                Cell::from(result.time_stamp.clone().unwrap_or_default()),
                Cell::from(result.audit_name.clone()),
                Cell::from(result.summary.clone()),
            ]);
            if selected_row == Some(i) {
                row.style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            } else {
                row
            }
        })
        .collect();

    let table = Table::new(rows, RESULT_WIDTHS)
        .header(header)
        .block(block)
        .flex(Flex::Legacy)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    if app.results.is_empty() {
        app.results_state.select(None);
    } else {
        app.results_state.select(Some(app.results.cursor()));
    }
    frame.render_stateful_widget(table, area, &mut app.results_state);

    let header_area = Rect { height: 1.min(inner.height), ..inner };
    let columns = Layout::horizontal(RESULT_WIDTHS)
        .flex(Flex::Legacy)
        .spacing(1)
        .split(header_area);
    app.areas.results = area;
    app.areas.results_body = Rect {
        y: inner.y + header_area.height,
        height: inner.height.saturating_sub(header_area.height),
        ..inner
    };
    app.areas.result_columns = Column::ALL.iter().copied().zip(columns.iter().copied()).collect();
}

fn draw_detail(frame: &mut Frame, app: &mut App, area: Rect) {
    app.areas.detail = area;
    let title = if app.detail.title().is_empty() {
        " Details ".to_string()
    } else {
        format!(" Details: {} ", app.detail.title())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::DarkGray));

    let body = if app.detail.is_empty() {
        vec![Line::styled(
            "Select a result to see its details",
            Style::default().fg(Color::DarkGray),
        )]
    } else {
        app.detail.lines().to_vec()
    };
    let paragraph = Paragraph::new(body)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(msg) = &app.status_message {
        msg.clone()
    } else {
        let elapsed = app
            .last_elapsed
            .map(|d| format!(" | analyzed in {} ms", d.as_millis()))
            .unwrap_or_default();
        format!(
            "q:Quit s:LineStart w:Wrap({}) Tab:Focus 1-4:Sort Enter:Select | line {}{}",
            if app.viewport.wrap_lines() { "ON" } else { "OFF" },
            app.viewport.closest_line_to_top() + 1,
            elapsed
        )
    };

    let paragraph =
        Paragraph::new(status).style(Style::default().fg(Color::White).bg(Color::Blue));
    frame.render_widget(paragraph, area);
}

fn draw_help_popup(frame: &mut Frame) {
    let area = frame.area();
    let popup_area = Rect {
        x: area.width.saturating_sub(HELP_POPUP_WIDTH).max(area.x),
        y: area.y,
        width: HELP_POPUP_WIDTH.min(area.width),
        height: HELP_POPUP_HEIGHT.min(area.height),
    };

    let help_text = vec![
        Line::from("Enter: Re-analyze | Esc: Cancel"),
        Line::from("Regex matched at the start of each line"),
        Line::from("Look-around is supported: (?=...)"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .border_style(Style::default().fg(Color::Green)),
        )
        .style(Style::default().bg(Color::Black));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(help, popup_area);
}
