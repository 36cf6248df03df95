use crate::analysis::{analyze, Analysis};
use crate::audit::AuditRegistry;
use crate::core::PatternConfig;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use fancy_regex::Regex;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub enum LogSource {
    File(PathBuf),
    Stdin,
}

impl LogSource {
    pub fn label(&self) -> String {
        match self {
            LogSource::File(path) => path.display().to_string(),
            LogSource::Stdin => "<stdin>".to_string(),
        }
    }
}

pub enum SourceEvent {
    /// Full text of the source, sent once at start and again whenever a
    /// watched file changes.
    Loaded(Arc<str>),
    Analyzed {
        generation: u64,
        analysis: Box<Analysis>,
    },
    Rejected {
        generation: u64,
        error: ConfigError,
    },
    Error(String),
}

pub fn start_source(source: LogSource, tx: Sender<SourceEvent>) -> Result<()> {
    match source {
        LogSource::File(path) => start_file_source(path, tx),
        LogSource::Stdin => start_stdin_source(tx),
    }
}

/// Read the whole source synchronously. Used by report mode.
pub fn read_source(source: &LogSource) -> Result<String> {
    match source {
        LogSource::File(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        LogSource::Stdin => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn start_file_source(path: PathBuf, tx: Sender<SourceEvent>) -> Result<()> {
    thread::spawn(move || {
        if let Err(e) = run_file_source(&path, &tx) {
            tracing::error!(path = %path.display(), error = %e, "file source stopped");
            let _ = tx.send(SourceEvent::Error(e.to_string()));
        }
    });
    Ok(())
}

fn load_file(path: &Path, tx: &Sender<SourceEvent>) -> Result<bool> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = text.len(), "loaded log file");
    Ok(tx.send(SourceEvent::Loaded(Arc::from(text))).is_ok())
}

fn run_file_source(path: &Path, tx: &Sender<SourceEvent>) -> Result<()> {
    if !load_file(path, tx)? {
        return Ok(());
    }

    let (notify_tx, notify_rx): (Sender<notify::Result<Event>>, Receiver<notify::Result<Event>>) =
        mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = notify_tx.send(res);
        },
        notify::Config::default().with_poll_interval(Duration::from_millis(100)),
    )?;
    watcher.watch(path, RecursiveMode::NonRecursive)?;

    loop {
        match notify_rx.recv_timeout(Duration::from_millis(500)) {
            Ok(Ok(event)) if event.kind.is_modify() || event.kind.is_create() => {
                // A single write usually fires several events.
                while notify_rx.try_recv().is_ok() {}
                match load_file(path, tx) {
                    Ok(true) => {}
                    Ok(false) => return Ok(()),
                    Err(e) => {
                        if tx.send(SourceEvent::Error(e.to_string())).is_err() {
                            return Ok(());
                        }
                    }
                }
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                if tx.send(SourceEvent::Error(e.to_string())).is_err() {
                    return Ok(());
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

fn start_stdin_source(tx: Sender<SourceEvent>) -> Result<()> {
    thread::spawn(move || match read_source(&LogSource::Stdin) {
        Ok(text) => {
            let _ = tx.send(SourceEvent::Loaded(Arc::from(text)));
        }
        Err(e) => {
            let _ = tx.send(SourceEvent::Error(e.to_string()));
        }
    });
    Ok(())
}

/// Analyze `text` on a worker thread and report back tagged with
/// `generation`, so the receiver can drop results that were superseded.
pub fn spawn_analysis(
    text: Arc<str>,
    patterns: PatternConfig,
    registry: Arc<AuditRegistry>,
    generation: u64,
    tx: Sender<SourceEvent>,
) {
    thread::spawn(move || {
        let event = match analyze(text, &patterns, &registry) {
            Ok(analysis) => SourceEvent::Analyzed {
                generation,
                analysis: Box::new(analysis),
            },
            Err(error) => {
                tracing::warn!(generation, %error, "analysis rejected");
                SourceEvent::Rejected { generation, error }
            }
        };
        let _ = tx.send(event);
    });
}

/// Files directly inside `dir` whose name matches `pattern`, sorted by path.
pub fn list_candidate_files(dir: &Path, pattern: &Regex) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        match pattern.is_match(&name) {
            Ok(true) => files.push(entry.path()),
            Ok(false) => {}
            Err(e) => tracing::debug!(file = %name, error = %e, "file name pattern failed"),
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_candidate_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.log", "a.log", "notes.txt", "c.log.1"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.log")).unwrap();

        let pattern = ViewConfig::default().file_name_regex().unwrap();
        let files = list_candidate_files(dir.path(), &pattern).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.log", "b.log"]);
    }

    #[test]
    fn test_list_candidate_files_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = Regex::new(".*").unwrap();
        assert!(list_candidate_files(&dir.path().join("gone"), &pattern).is_err());
    }

    #[test]
    fn test_file_source_sends_loaded_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "2024-01-01 10:00:00,000 INFO hi\n").unwrap();
        let (tx, rx) = mpsc::channel();
        start_source(LogSource::File(path), tx).unwrap();
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            SourceEvent::Loaded(text) => assert_eq!(&*text, "2024-01-01 10:00:00,000 INFO hi\n"),
            _ => panic!("expected loaded text"),
        }
    }

    #[test]
    fn test_spawn_analysis_reports_generation() {
        let patterns = ViewConfig::default().pattern_config().unwrap();
        let registry = Arc::new(AuditRegistry::default());
        let (tx, rx) = mpsc::channel();

        spawn_analysis(
            Arc::from("2024-01-01 10:00:00,000 ERROR [x] boom"),
            patterns.clone(),
            Arc::clone(&registry),
            7,
            tx.clone(),
        );
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            SourceEvent::Analyzed {
                generation,
                analysis,
            } => {
                assert_eq!(generation, 7);
                assert_eq!(analysis.results.len(), 1);
            }
            _ => panic!("expected analysis"),
        }

        spawn_analysis(Arc::from("no timestamp"), patterns, registry, 8, tx);
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            SourceEvent::Rejected { generation, error } => {
                assert_eq!(generation, 8);
                assert!(matches!(error, ConfigError::StartPatternMismatch { .. }));
            }
            _ => panic!("expected rejection"),
        }
    }
}
