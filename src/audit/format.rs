//! Text formatters used by the SQL detail view.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::{Captures, Regex};
use std::sync::LazyLock;

const KEYWORDS: &str = "SELECT|DISTINCT|FROM|WHERE|GROUP|ORDER|BY|HAVING|LIMIT|OFFSET|UNION|ALL|\
JOIN|INNER|LEFT|RIGHT|FULL|OUTER|CROSS|ON|AS|AND|OR|NOT|IN|IS|NULL|LIKE|BETWEEN|CASE|WHEN|THEN|\
ELSE|END|INSERT|INTO|VALUES|UPDATE|SET|DELETE|EXISTS|ASC|DESC|TOP|WITH|COUNT|SUM|AVG|MIN|MAX";

static SQL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?P<string>'(?:[^']|'')*'?)|(?P<comment>--[^\n]*)|(?P<number>\b\d+(?:\.\d+)?\b)|(?P<keyword>\b(?:{})\b)",
        KEYWORDS
    ))
    .unwrap()
});

static CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(FROM|WHERE|GROUP\s+BY|ORDER\s+BY|HAVING|LIMIT|UNION(?:\s+ALL)?|(?:(?:LEFT|RIGHT|FULL|INNER|CROSS)\s+)?(?:OUTER\s+)?JOIN)\b",
    )
    .unwrap()
});

static CONDITION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+(AND|OR)\s+").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Reflow a query: one clause per line, conditions indented, keywords
/// upper-cased. String literals are left untouched.
pub fn pretty_print_sql(query: &str) -> String {
    let mut out = String::new();
    let mut last = 0;
    for m in SQL_TOKEN.captures_iter(query) {
        if let Some(s) = m.name("string").or_else(|| m.name("comment")) {
            out.push_str(&reflow(&query[last..s.start()]));
            out.push_str(s.as_str());
            last = s.end();
        }
    }
    out.push_str(&reflow(&query[last..]));
    out.trim().to_string()
}

fn reflow(fragment: &str) -> String {
    let collapsed = WHITESPACE.replace_all(fragment, " ");
    let upper = SQL_TOKEN.replace_all(&collapsed, |caps: &Captures| match caps.name("keyword") {
        Some(k) => k.as_str().to_uppercase(),
        None => caps[0].to_string(),
    });
    let clauses = CLAUSE.replace_all(&upper, |caps: &Captures| {
        format!("\n{}", WHITESPACE.replace_all(&caps[1], " "))
    });
    CONDITION
        .replace_all(&clauses, |caps: &Captures| format!("\n  {} ", &caps[1]))
        .into_owned()
}

/// Split SQL into styled lines for display.
pub fn highlight_sql(text: &str) -> Vec<Line<'static>> {
    text.lines().map(highlight_sql_line).collect()
}

fn highlight_sql_line(line: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in SQL_TOKEN.captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            spans.push(Span::raw(line[last..whole.start()].to_string()));
        }
        let style = if caps.name("keyword").is_some() {
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)
        } else if caps.name("string").is_some() {
            Style::default().fg(Color::Green)
        } else if caps.name("number").is_some() {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(whole.as_str().to_string(), style));
        last = whole.end();
    }
    if last < line.len() {
        spans.push(Span::raw(line[last..].to_string()));
    }
    Line::from(spans)
}
