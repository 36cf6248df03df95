use crate::audit::AuditResult;
use crate::error::{ConfigError, NavigationError};
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Level,
    TimeStamp,
    AuditName,
    Summary,
}

impl Column {
    pub const ALL: [Column; 4] = [
        Column::Level,
        Column::TimeStamp,
        Column::AuditName,
        Column::Summary,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Column::Level => "Level",
            Column::TimeStamp => "Time",
            Column::AuditName => "Type",
            Column::Summary => "Summary",
        }
    }

    fn compare(self, a: &AuditResult, b: &AuditResult) -> Ordering {
        match self {
            Column::Level => a.result_level.level.cmp(&b.result_level.level),
            Column::TimeStamp => a
                .time_stamp
                .as_deref()
                .unwrap_or("")
                .cmp(b.time_stamp.as_deref().unwrap_or("")),
            Column::AuditName => a.audit_name.cmp(&b.audit_name),
            Column::Summary => a.summary.cmp(&b.summary),
        }
    }
}

impl FromStr for Column {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "level" => Ok(Column::Level),
            "time" | "timestamp" => Ok(Column::TimeStamp),
            "type" | "audit" => Ok(Column::AuditName),
            "summary" => Ok(Column::Summary),
            _ => Err(ConfigError::UnknownColumn(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortState {
    pub column: Column,
    pub desc: bool,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            column: Column::TimeStamp,
            desc: false,
        }
    }
}

impl FromStr for SortState {
    type Err = ConfigError;

    /// `column` or `column:desc` / `column:asc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, direction) = match s.split_once(':') {
            Some((c, d)) => (c, Some(d)),
            None => (s, None),
        };
        let desc = match direction.map(|d| d.trim().to_ascii_lowercase()) {
            None => false,
            Some(d) if d == "asc" => false,
            Some(d) if d == "desc" => true,
            Some(_) => return Err(ConfigError::UnknownColumn(s.to_string())),
        };
        Ok(Self {
            column: column.parse()?,
            desc,
        })
    }
}

pub type SelectionCallback = Box<dyn FnMut(&Arc<AuditResult>, usize) + Send>;

/// Audit results with one sort order and at most one selected row.
///
/// Sorting is stable, so rows with equal keys keep their previous
/// relative order.
#[derive(Default)]
pub struct ResultList {
    results: Vec<Arc<AuditResult>>,
    sort: SortState,
    selected: Option<Arc<AuditResult>>,
    cursor: usize,
    on_select: Option<SelectionCallback>,
}

impl ResultList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_on_select(&mut self, callback: SelectionCallback) {
        self.on_select = Some(callback);
    }

    /// Replace the rows and apply the current sort order.
    pub fn set_results(&mut self, results: Vec<Arc<AuditResult>>) {
        self.results = results;
        if let Some(selected) = &self.selected {
            if !self.results.iter().any(|r| Arc::ptr_eq(r, selected)) {
                self.selected = None;
            }
        }
        self.cursor = self.cursor.min(self.results.len().saturating_sub(1));
        self.apply_sort();
    }

    pub fn results(&self) -> &[Arc<AuditResult>] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    /// Toggle direction on the active column, otherwise sort the new
    /// column ascending.
    pub fn on_header_click(&mut self, column: Column) {
        let desc = self.sort.column == column && !self.sort.desc;
        self.sort_by(column, desc);
    }

    pub fn sort_by(&mut self, column: Column, desc: bool) {
        self.sort = SortState { column, desc };
        self.apply_sort();
    }

    fn apply_sort(&mut self) {
        let SortState { column, desc } = self.sort;
        self.results.sort_by(|a, b| {
            let ordering = column.compare(a, b);
            if desc {
                ordering.reverse()
            } else {
                ordering
            }
        });
        if let Some(row) = self.selected_row() {
            self.cursor = row;
        }
    }

    pub fn selected(&self) -> Option<&Arc<AuditResult>> {
        self.selected.as_ref()
    }

    pub fn selected_row(&self) -> Option<usize> {
        let selected = self.selected.as_ref()?;
        self.results.iter().position(|r| Arc::ptr_eq(r, selected))
    }

    /// Make `row` the single selection and notify the selection callback.
    pub fn select(&mut self, row: usize) -> Result<(), NavigationError> {
        let result = self
            .results
            .get(row)
            .cloned()
            .ok_or(NavigationError::RowOutOfRange {
                requested: row,
                count: self.results.len(),
            })?;
        self.cursor = row;
        self.selected = Some(result.clone());
        if let Some(callback) = self.on_select.as_mut() {
            callback(&result, result.message_num);
        }
        Ok(())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: i64) {
        if self.results.is_empty() {
            self.cursor = 0;
            return;
        }
        let max = self.results.len() as i64 - 1;
        self.cursor = (self.cursor as i64 + delta).clamp(0, max) as usize;
    }

    pub fn select_cursor(&mut self) -> Result<(), NavigationError> {
        self.select(self.cursor)
    }
}
