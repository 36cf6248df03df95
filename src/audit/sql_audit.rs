use crate::audit::format::{highlight_sql, pretty_print_sql};
use crate::audit::{first_line, Audit, AuditPluginResult, AuditResult, RenderData, ResultLevel};
use crate::constants::{
    MISSING_AGGREGATE_REASON, MISSING_QUERY_TEXT, SQL_ROW_COUNT_WARNING_THRESHOLD,
    TIMESTAMP_FORMAT,
};
use crate::core::LogMessage;
use crate::detail::DetailPanel;
use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static STATEMENT_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"SQL Stmt:").unwrap());
static STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<thread>#\d+)\b[^\n]*?(?P<report>\[[^\]\n]*\])\s*(?P<session>\[[^\]\n]*\])[^\n]*?SQL Stmt:\s*(?P<query>(?s:.*))",
    )
    .unwrap()
});
static QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SQL Stmt:\s*(?P<query>(?s:.*))").unwrap());
static IDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<thread>#\d+)\b[^\n]*?(?P<report>\[[^\]\n]*\])\s*(?P<session>\[[^\]\n]*\])")
        .unwrap()
});
static ROWS_RETURNED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"rows returned:\s*(\d+)").unwrap());
static AGGREGATE_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)aggregate requirement failed[:\s]*(?P<reason>[^\n]*)").unwrap()
});

/// Thread, report and session identifiers embedded in a message header.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CorrelationIds {
    pub thread: String,
    pub report: String,
    pub session: String,
}

impl CorrelationIds {
    pub fn from_header(header: &str) -> Option<Self> {
        let caps = IDS.captures(header)?;
        Some(Self {
            thread: caps["thread"].to_string(),
            report: caps["report"].to_string(),
            session: caps["session"].to_string(),
        })
    }

    fn matches(&self, header: &str) -> bool {
        Self::from_header(header).is_some_and(|other| &other == self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SqlStatement {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<CorrelationIds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_aggregate_failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_time_stamp: Option<String>,
}

/// Reports every `SQL Stmt:` message.
///
/// When the statement carries thread, report and session ids, the audit
/// looks forward for the matching `rows returned: N` message and backward
/// for the closest `aggregate requirement failed` message with the same
/// ids. Both are plain linear scans, so a file with many correlated
/// statements costs O(n²) in the worst case.
pub struct SqlStatementAudit;

struct RowCount {
    /// `None` when the count does not fit a `u64`.
    num_rows: Option<u64>,
    time_stamp: Option<String>,
}

impl SqlStatementAudit {
    fn inspect(messages: &[LogMessage<'_>], index: usize) -> Option<AuditPluginResult> {
        let message = &messages[index];
        if !STATEMENT_MARKER.is_match(message.text) {
            return None;
        }

        let (ids, query) = match STATEMENT.captures(message.text) {
            Some(caps) => (
                Some(CorrelationIds {
                    thread: caps["thread"].to_string(),
                    report: caps["report"].to_string(),
                    session: caps["session"].to_string(),
                }),
                caps["query"].to_string(),
            ),
            None => (
                None,
                QUERY
                    .captures(message.text)
                    .map(|c| c["query"].to_string())
                    .unwrap_or_default(),
            ),
        };
        let query = match query.trim() {
            "" => MISSING_QUERY_TEXT.to_string(),
            q => q.to_string(),
        };

        let (rows, aggregate_failure) = match &ids {
            Some(ids) => (
                find_row_count(messages, index, ids),
                find_aggregate_failure(messages, index, ids),
            ),
            None => (None, None),
        };

        let num_rows = rows.as_ref().and_then(|r| r.num_rows);
        let result_level = match num_rows {
            Some(n) if n > SQL_ROW_COUNT_WARNING_THRESHOLD => {
                ResultLevel::warning(format!("Query returned {} rows", n))
            }
            _ => ResultLevel::info(),
        };

        Some(AuditPluginResult {
            summary: first_line(&query).to_string(),
            message_num: message.num,
            time_stamp: message.time_stamp.map(str::to_string),
            render_data: RenderData::Sql(SqlStatement {
                query,
                ids,
                num_rows,
                sql_aggregate_failure_reason: aggregate_failure,
                rows_time_stamp: rows.and_then(|r| r.time_stamp),
            }),
            result_level,
        })
    }
}

/// First later message with the same ids and a row count. The scan stops
/// there even if the count cannot be parsed.
fn find_row_count(
    messages: &[LogMessage<'_>],
    index: usize,
    ids: &CorrelationIds,
) -> Option<RowCount> {
    messages[index + 1..].iter().find_map(|m| {
        if !ids.matches(m.header) {
            return None;
        }
        let caps = ROWS_RETURNED.captures(m.text)?;
        let num_rows = caps[1].parse().ok();
        if num_rows.is_none() {
            tracing::debug!(count = &caps[1], "row count out of range");
        }
        Some(RowCount {
            num_rows,
            time_stamp: m.time_stamp.map(str::to_string),
        })
    })
}

/// Most recent earlier message with the same ids and an aggregate failure.
fn find_aggregate_failure(
    messages: &[LogMessage<'_>],
    index: usize,
    ids: &CorrelationIds,
) -> Option<String> {
    messages[..index].iter().rev().find_map(|m| {
        if !ids.matches(m.header) {
            return None;
        }
        let caps = AGGREGATE_FAILED.captures(m.text)?;
        let reason = caps["reason"].trim();
        Some(if reason.is_empty() {
            MISSING_AGGREGATE_REASON.to_string()
        } else {
            reason.to_string()
        })
    })
}

fn elapsed_millis(from: &str, to: &str) -> Option<i64> {
    let from = NaiveDateTime::parse_from_str(from, TIMESTAMP_FORMAT).ok()?;
    let to = NaiveDateTime::parse_from_str(to, TIMESTAMP_FORMAT).ok()?;
    Some(to.signed_duration_since(from).num_milliseconds())
}

impl Audit for SqlStatementAudit {
    fn name(&self) -> &'static str {
        "SQL Statements"
    }

    fn scan<'a>(
        &'a self,
        messages: &'a [LogMessage<'a>],
    ) -> Box<dyn Iterator<Item = AuditPluginResult> + 'a> {
        Box::new((0..messages.len()).filter_map(move |index| Self::inspect(messages, index)))
    }

    fn render_detail(&self, result: &AuditResult, panel: &mut DetailPanel) {
        panel.set_title(self.name());
        let RenderData::Sql(statement) = &result.render_data else {
            tracing::warn!(audit = %result.audit_name, "sql audit asked to render foreign data");
            panel.text_block(&result.summary);
            return;
        };

        if let Some(ts) = &result.time_stamp {
            panel.field("Time", ts);
        }
        if let Some(ids) = &statement.ids {
            panel.field("Thread", &ids.thread);
            panel.field("Report", &ids.report);
            panel.field("Session", &ids.session);
        }
        let rows = statement
            .num_rows
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        panel.field("Rows returned", &rows);
        if let (Some(start), Some(end)) = (&result.time_stamp, &statement.rows_time_stamp) {
            if let Some(ms) = elapsed_millis(start, end) {
                panel.field("Elapsed", &format!("{} ms", ms));
            }
        }
        if let Some(reason) = &statement.sql_aggregate_failure_reason {
            panel.field("Aggregate failure", reason);
        }
        if let Some(reason) = &result.result_level.reason {
            panel.field("Warning", reason);
        }
        panel.blank();
        panel.code_block(highlight_sql(&pretty_print_sql(&statement.query)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Level;
    use crate::constants::DEFAULT_MESSAGE_START_PATTERN;
    use crate::core::{HighlighterSet, LogDocument, PatternConfig};
    use pretty_assertions::assert_eq;

    fn run(text: &str) -> Vec<AuditPluginResult> {
        let config =
            PatternConfig::new(DEFAULT_MESSAGE_START_PATTERN, HighlighterSet::new()).unwrap();
        let doc = LogDocument::parse(text.to_string(), &config).unwrap();
        let messages = doc.messages();
        SqlStatementAudit.scan(&messages).collect()
    }

    fn statement(result: &AuditPluginResult) -> &SqlStatement {
        match &result.render_data {
            RenderData::Sql(s) => s,
            other => panic!("unexpected render data {other:?}"),
        }
    }

    #[test]
    fn test_row_count_over_threshold_warns() {
        let results = run("\
2024-01-01 10:00:00,000 #7 INFO [R1] [S1] SQL Stmt: select * from big
2024-01-01 10:00:01,000 #8 INFO [R2] [S2] unrelated
2024-01-01 10:00:03,500 #7 INFO [R1] [S1] SQL Stmt rows returned: 600000");
        assert_eq!(results.len(), 1);
        let stmt = statement(&results[0]);
        assert_eq!(stmt.num_rows, Some(600_000));
        assert_eq!(results[0].result_level.level, Level::Warning);
        assert_eq!(
            results[0].result_level.reason.as_deref(),
            Some("Query returned 600000 rows")
        );
        assert_eq!(stmt.rows_time_stamp.as_deref(), Some("2024-01-01 10:00:03,500"));
        assert_eq!(
            stmt.ids,
            Some(CorrelationIds {
                thread: "#7".to_string(),
                report: "[R1]".to_string(),
                session: "[S1]".to_string(),
            })
        );
    }

    #[test]
    fn test_small_row_count_is_info_and_first_match_wins() {
        let results = run("\
2024-01-01 10:00:00,000 #7 INFO [R1] [S1] SQL Stmt: select 1
2024-01-01 10:00:01,000 #7 INFO [R1] [S2] SQL Stmt rows returned: 999999
2024-01-01 10:00:02,000 #7 INFO [R1] [S1] SQL Stmt rows returned: 12
2024-01-01 10:00:03,000 #7 INFO [R1] [S1] SQL Stmt rows returned: 13");
        assert_eq!(statement(&results[0]).num_rows, Some(12));
        assert_eq!(results[0].result_level, ResultLevel::info());
    }

    #[test]
    fn test_unparsable_first_row_count_is_not_skipped() {
        let results = run("\
2024-01-01 10:00:00,000 #7 INFO [R1] [S1] SQL Stmt: select 1
2024-01-01 10:00:01,000 #7 INFO [R1] [S1] SQL Stmt rows returned: 99999999999999999999999
2024-01-01 10:00:02,000 #7 INFO [R1] [S1] SQL Stmt rows returned: 3");
        let stmt = statement(&results[0]);
        assert_eq!(stmt.num_rows, None);
        assert_eq!(stmt.rows_time_stamp.as_deref(), Some("2024-01-01 10:00:01,000"));
        assert_eq!(results[0].result_level, ResultLevel::info());
    }

    #[test]
    fn test_aggregate_failure_takes_most_recent_prior_message() {
        let results = run("\
2024-01-01 10:00:00,000 #7 WARN [R1] [S1] Aggregate requirement failed: old reason
2024-01-01 10:00:01,000 #7 WARN [R1] [S1] Aggregate requirement failed: too many groups
2024-01-01 10:00:02,000 #7 INFO [R1] [S1] SQL Stmt: select a, count(*) from t group by a
2024-01-01 10:00:03,000 #7 WARN [R1] [S1] Aggregate requirement failed: after the fact");
        let stmt = statement(&results[0]);
        assert_eq!(
            stmt.sql_aggregate_failure_reason.as_deref(),
            Some("too many groups")
        );
        assert_eq!(stmt.num_rows, None);
    }

    #[test]
    fn test_missing_ids_skip_correlation() {
        let results = run("\
2024-01-01 10:00:00,000 INFO SQL Stmt: select 1
2024-01-01 10:00:01,000 #7 INFO [R1] [S1] SQL Stmt rows returned: 5");
        assert_eq!(results.len(), 1);
        let stmt = statement(&results[0]);
        assert_eq!(stmt.ids, None);
        assert_eq!(stmt.num_rows, None);
        assert_eq!(stmt.query, "select 1");
    }

    #[test]
    fn test_multiline_query_summary_is_first_line() {
        let results = run("\
2024-01-01 10:00:00,000 #7 INFO [R1] [S1] SQL Stmt: select a
  from t
  where b = 1");
        assert_eq!(results[0].summary, "select a");
        assert_eq!(statement(&results[0]).query, "select a\n  from t\n  where b = 1");
    }

    #[test]
    fn test_empty_query_uses_placeholder() {
        let results = run("2024-01-01 10:00:00,000 #7 INFO [R1] [S1] SQL Stmt:");
        assert_eq!(results[0].summary, MISSING_QUERY_TEXT);
    }

    #[test]
    fn test_render_detail_includes_elapsed_and_query() {
        let plugin = run("\
2024-01-01 10:00:00,000 #7 INFO [R1] [S1] SQL Stmt: select * from t where x = 1
2024-01-01 10:00:01,250 #7 INFO [R1] [S1] SQL Stmt rows returned: 4")
        .remove(0);
        let result = AuditResult::new("SQL Statements", plugin);
        let mut panel = DetailPanel::default();
        SqlStatementAudit.render_detail(&result, &mut panel);
        let text = panel.plain_text();
        assert!(text.contains("Elapsed: 1250 ms"));
        assert!(text.contains("Rows returned: 4"));
        assert!(text.contains("WHERE"));
    }
}
