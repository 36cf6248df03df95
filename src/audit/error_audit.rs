use crate::audit::{Audit, AuditPluginResult, AuditResult, RenderData, ResultLevel};
use crate::constants::{MISSING_ERROR_TEXT, MISSING_FULL_ERROR_TEXT};
use crate::core::LogMessage;
use crate::detail::DetailPanel;
use regex::Regex;
use std::sync::LazyLock;

static SEVERE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\sERROR").unwrap());
static SUMMARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.+\]\s+(.*)$").unwrap());
static FULL_TEXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.+\]\s+((?s:.*))").unwrap());

/// Flags every message whose header line carries ` ERROR`.
pub struct ErrorAudit;

impl ErrorAudit {
    fn inspect(message: &LogMessage<'_>) -> Option<AuditPluginResult> {
        if !SEVERE_MARKER.is_match(message.header) {
            return None;
        }

        let summary = SUMMARY
            .captures(message.header)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_end().to_string())
            .unwrap_or_else(|| MISSING_ERROR_TEXT.to_string());
        let full_text = FULL_TEXT
            .captures(message.text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| MISSING_FULL_ERROR_TEXT.to_string());

        Some(AuditPluginResult {
            summary,
            message_num: message.num,
            time_stamp: message.time_stamp.map(str::to_string),
            render_data: RenderData::Error(full_text),
            result_level: ResultLevel::severe(),
        })
    }
}

impl Audit for ErrorAudit {
    fn name(&self) -> &'static str {
        "Errors"
    }

    fn scan<'a>(
        &'a self,
        messages: &'a [LogMessage<'a>],
    ) -> Box<dyn Iterator<Item = AuditPluginResult> + 'a> {
        Box::new(messages.iter().filter_map(Self::inspect))
    }

    fn render_detail(&self, result: &AuditResult, panel: &mut DetailPanel) {
        panel.set_title(self.name());
        if let Some(ts) = &result.time_stamp {
            panel.field("Time", ts);
        }
        panel.field("Message", &result.message_num.to_string());
        panel.blank();
        match &result.render_data {
            RenderData::Error(text) => panel.text_block(text.trim()),
            other => {
                tracing::warn!(?other, "error audit asked to render foreign data");
                panel.text_block(&result.summary);
            }
        }
    }
}
