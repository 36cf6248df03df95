mod analysis;
mod app;
mod audit;
mod config;
mod constants;
mod core;
mod detail;
mod error;
mod highlight;
mod input;
mod logging;
mod results;
mod source;
mod tui;
mod viewport;
mod wrap;

use anyhow::{Context, Result};
use app::{App, Focus, InputMode};
use clap::Parser;
use config::ViewConfig;
use constants::{ANIMATION_FRAME_MS, POLL_INTERVAL_MS};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use logging::{init_logging, LogTarget};
use ratatui::{backend::CrosstermBackend, Terminal};
use results::{Column, ResultList, SortState};
use source::{list_candidate_files, read_source, start_source, LogSource, SourceEvent};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "logaudit")]
#[command(about = "Audit application logs for errors and expensive SQL statements")]
struct Cli {
    #[arg(help = "Log file to audit (reads from stdin if not provided)")]
    file: Option<PathBuf>,

    #[arg(short = 'c', long = "config", help = "View config JSON (default: ./.logaudit.json)")]
    config: Option<PathBuf>,

    #[arg(short = 's', long = "line-start", help = "Regex that starts a new message")]
    line_start: Option<String>,

    #[arg(short = 'w', long = "wrap", help = "Start with word wrap enabled")]
    wrap: bool,

    #[arg(long = "log-file", help = "Write diagnostics to this file")]
    log_file: Option<PathBuf>,

    #[arg(long = "list", value_name = "DIR", help = "List candidate log files in DIR and exit")]
    list: Option<PathBuf>,

    #[arg(long = "report", help = "Print audit results as JSON lines and exit")]
    report: bool,

    #[arg(long = "sort", default_value = "time", help = "Result order: column[:asc|desc]")]
    sort: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let headless = cli.report || cli.list.is_some();
    let target = match (&cli.log_file, headless) {
        (Some(path), _) => LogTarget::File(path),
        (None, true) => LogTarget::Stderr,
        (None, false) => LogTarget::Off,
    };
    init_logging(target)?;

    let mut config = ViewConfig::discover(cli.config.as_deref())?;
    if let Some(pattern) = &cli.line_start {
        config.message_start_pattern = pattern.clone();
    }
    if cli.wrap {
        config.wrap_lines = true;
    }
    let sort: SortState = cli.sort.parse()?;

    if let Some(dir) = &cli.list {
        let pattern = config.file_name_regex()?;
        let mut stdout = io::stdout().lock();
        for path in list_candidate_files(dir, &pattern)? {
            writeln!(stdout, "{}", path.display())?;
        }
        return Ok(());
    }

    let patterns = config.pattern_config()?;
    let source = match cli.file {
        Some(path) => LogSource::File(path),
        None => LogSource::Stdin,
    };

    if cli.report {
        return run_report(&source, &patterns, sort);
    }

    let (tx, rx) = mpsc::channel::<SourceEvent>();
    let label = source.label();
    start_source(source, tx.clone())?;
    let app = App::new(&config, patterns, sort, label, tx, rx);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        tracing::error!(error = %e, "event loop failed");
        eprintln!("Error: {}", e);
    }

    Ok(())
}

fn run_report(
    source: &LogSource,
    patterns: &crate::core::PatternConfig,
    sort: SortState,
) -> Result<()> {
    let text = read_source(source)?;
    let registry = audit::AuditRegistry::default();
    let analysis = analysis::analyze(Arc::from(text), patterns, &registry)
        .with_context(|| format!("cannot analyze {}", source.label()))?;

    let mut list = ResultList::new();
    list.sort_by(sort.column, sort.desc);
    list.set_results(analysis.results);

    let mut stdout = io::stdout().lock();
    for result in list.results() {
        writeln!(stdout, "{}", serde_json::to_string(result.as_ref())?)?;
    }
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        app.poll_source();
        app.poll_selection();
        app.tick();

        terminal.draw(|f| tui::draw(f, &mut app))?;

        let timeout = if app.viewport.is_animating() {
            ANIMATION_FRAME_MS
        } else {
            POLL_INTERVAL_MS
        };
        if event::poll(Duration::from_millis(timeout))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key(&mut app, key) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                // The next draw feeds the new size to the viewport.
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }
}

/// Returns true when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if app.input_mode == InputMode::LineStartEdit {
        app.handle_input_key(key.code);
        return false;
    }

    app.status_message = None;
    let page = app.page_rows();
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('s') => app.start_line_start_edit(),
        KeyCode::Char('w') => app.toggle_wrap(),
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Esc => app.viewport.finish_animation(),
        KeyCode::Char(c @ '1'..='4') => {
            let index = c as usize - '1' as usize;
            app.sort_by_column(Column::ALL[index]);
        }
        code => match app.focus {
            Focus::Log => match code {
                KeyCode::Down | KeyCode::Char('j') => app.viewport.scroll_rows(1),
                KeyCode::Up | KeyCode::Char('k') => app.viewport.scroll_rows(-1),
                KeyCode::PageDown => app.viewport.scroll_rows(page),
                KeyCode::PageUp => app.viewport.scroll_rows(-page),
                KeyCode::Home | KeyCode::Char('g') => app.viewport.scroll_to_start(),
                KeyCode::End | KeyCode::Char('G') => app.viewport.scroll_to_end(),
                _ => {}
            },
            Focus::Results => match code {
                KeyCode::Down | KeyCode::Char('j') => app.move_result_cursor(1),
                KeyCode::Up | KeyCode::Char('k') => app.move_result_cursor(-1),
                KeyCode::PageDown => app.move_result_cursor(page),
                KeyCode::PageUp => app.move_result_cursor(-page),
                KeyCode::Home | KeyCode::Char('g') => app.move_result_cursor(i64::MIN / 2),
                KeyCode::End | KeyCode::Char('G') => app.move_result_cursor(i64::MAX / 2),
                KeyCode::Enter => app.select_result_at_cursor(),
                _ => {}
            },
        },
    }
    false
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.on_click(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.on_wheel(mouse.column, mouse.row, true),
        MouseEventKind::ScrollUp => app.on_wheel(mouse.column, mouse.row, false),
        _ => {}
    }
}
