//! Pluggable scans over the message sequence.
//!
//! An [`Audit`] turns the ordered messages of one document into a lazy
//! sequence of findings and knows how to draw the details of its own
//! findings. Audits share nothing but the read-only message slice, so the
//! registry can run them in any order or on any thread.

pub mod error_audit;
pub mod format;
pub mod sql_audit;

use crate::core::LogMessage;
use crate::detail::DetailPanel;
use serde::Serialize;

pub use error_audit::ErrorAudit;
pub use sql_audit::{SqlStatement, SqlStatementAudit};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Severe,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Severe => "severe",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultLevel {
    pub level: Level,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ResultLevel {
    pub fn info() -> Self {
        Self {
            level: Level::Info,
            reason: None,
        }
    }

    pub fn warning(reason: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            reason: Some(reason.into()),
        }
    }

    pub fn severe() -> Self {
        Self {
            level: Level::Severe,
            reason: None,
        }
    }
}

/// Audit-specific payload kept for the detail view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RenderData {
    Error(String),
    Sql(SqlStatement),
}

/// One finding as produced by an audit pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditPluginResult {
    pub summary: String,
    pub message_num: usize,
    pub time_stamp: Option<String>,
    pub render_data: RenderData,
    pub result_level: ResultLevel,
}

/// A finding qualified with the name of the audit that produced it.
///
/// `message_num` indexes the document's messages, never its lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditResult {
    pub audit_name: String,
    pub summary: String,
    pub message_num: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_stamp: Option<String>,
    pub render_data: RenderData,
    pub result_level: ResultLevel,
}

impl AuditResult {
    pub fn new(audit_name: &str, result: AuditPluginResult) -> Self {
        Self {
            audit_name: audit_name.to_string(),
            summary: result.summary,
            message_num: result.message_num,
            time_stamp: result.time_stamp,
            render_data: result.render_data,
            result_level: result.result_level,
        }
    }
}

pub trait Audit: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lazily scan `messages`. Each call starts a fresh pass.
    fn scan<'a>(
        &'a self,
        messages: &'a [LogMessage<'a>],
    ) -> Box<dyn Iterator<Item = AuditPluginResult> + 'a>;

    /// Draw the full details of one of this audit's results.
    fn render_detail(&self, result: &AuditResult, panel: &mut DetailPanel);
}

pub struct AuditRegistry {
    audits: Vec<Box<dyn Audit>>,
}

impl Default for AuditRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ErrorAudit);
        registry.register(SqlStatementAudit);
        registry
    }
}

impl AuditRegistry {
    pub fn empty() -> Self {
        Self { audits: Vec::new() }
    }

    pub fn register(&mut self, audit: impl Audit + 'static) {
        self.audits.push(Box::new(audit));
    }

    pub fn audits(&self) -> impl Iterator<Item = &dyn Audit> {
        self.audits.iter().map(|a| a.as_ref())
    }

    pub fn find(&self, name: &str) -> Option<&dyn Audit> {
        self.audits().find(|a| a.name() == name)
    }

    /// Results of every registered audit, one audit after the other.
    pub fn run<'a>(
        &'a self,
        messages: &'a [LogMessage<'a>],
    ) -> impl Iterator<Item = AuditResult> + 'a {
        self.audits.iter().flat_map(move |audit| {
            let name = audit.name();
            audit
                .scan(messages)
                .map(move |result| AuditResult::new(name, result))
        })
    }

    /// Delegate to the audit that produced `result`.
    pub fn render_detail(&self, result: &AuditResult, panel: &mut DetailPanel) {
        panel.clear();
        match self.find(&result.audit_name) {
            Some(audit) => audit.render_detail(result, panel),
            None => {
                tracing::warn!(audit = %result.audit_name, "no audit registered for result");
                panel.set_title(&result.audit_name);
                panel.text_block(&result.summary);
            }
        }
    }
}

/// First line of `text`, trimmed.
pub(crate) fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}
