use crate::audit::{AuditRegistry, AuditResult};
use crate::core::{LogDocument, PatternConfig};
use crate::error::ConfigError;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A parsed document together with everything the audits found in it.
#[derive(Debug)]
pub struct Analysis {
    pub document: Arc<LogDocument>,
    pub results: Vec<Arc<AuditResult>>,
    pub elapsed: Duration,
}

/// Segment `text` into messages and run every registered audit over them.
pub fn analyze(
    text: Arc<str>,
    patterns: &PatternConfig,
    registry: &AuditRegistry,
) -> Result<Analysis, ConfigError> {
    let started = Instant::now();
    let document = LogDocument::parse(text, patterns)?;
    let messages = document.messages();
    let results: Vec<Arc<AuditResult>> = registry.run(&messages).map(Arc::new).collect();
    for audit in registry.audits() {
        let count = results.iter().filter(|r| r.audit_name == audit.name()).count();
        tracing::debug!(audit = audit.name(), results = count, "audit finished");
    }

    let elapsed = started.elapsed();
    tracing::info!(
        lines = document.line_count(),
        messages = document.message_count(),
        results = results.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "analysis finished"
    );
    Ok(Analysis {
        document: Arc::new(document),
        results,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Level;
    use crate::config::ViewConfig;
    use pretty_assertions::assert_eq;

    const LOG: &str = "\
2024-01-01 10:00:00,000 #1 INFO [R1] [S1] starting
2024-01-01 10:00:01,000 #1 ERROR [R1] [S1] Disk full
    at write()
2024-01-01 10:00:02,000 #2 INFO [R2] [S2] SQL Stmt: select * from t
2024-01-01 10:00:03,000 #2 INFO [R2] [S2] SQL Stmt rows returned: 12";

    #[test]
    fn test_analyze_runs_every_audit() {
        let patterns = ViewConfig::default().pattern_config().unwrap();
        let analysis = analyze(Arc::from(LOG), &patterns, &AuditRegistry::default()).unwrap();
        assert_eq!(analysis.document.message_count(), 4);
        let names: Vec<&str> = analysis
            .results
            .iter()
            .map(|r| r.audit_name.as_str())
            .collect();
        assert_eq!(names, vec!["Errors", "SQL Statements"]);
        assert_eq!(analysis.results[0].message_num, 1);
        assert_eq!(analysis.results[0].result_level.level, Level::Severe);
        assert_eq!(analysis.results[1].message_num, 2);
    }

    #[test]
    fn test_mismatched_start_pattern_is_an_error() {
        let patterns = ViewConfig::default().pattern_config().unwrap();
        let err = analyze(Arc::from("garbage\n"), &patterns, &AuditRegistry::default()).unwrap_err();
        assert!(matches!(err, ConfigError::StartPatternMismatch { line: 1, .. }));
    }
}
