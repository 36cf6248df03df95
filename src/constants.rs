pub const LINE_NUMBER_WIDTH: usize = 9;

pub const POLL_INTERVAL_MS: u64 = 50;
pub const ANIMATION_FRAME_MS: u64 = 16;

pub const INPUT_FIELD_HEIGHT: u16 = 3;
pub const STATUS_BAR_HEIGHT: u16 = 1;

pub const HELP_POPUP_WIDTH: u16 = 48;
pub const HELP_POPUP_HEIGHT: u16 = 5;

/// Lines materialized above and below the visible area.
pub const RENDER_MARGIN: usize = 20;

/// Height of one rendered line in terminal rows.
pub const TERMINAL_LINE_HEIGHT: f64 = 1.0;

/// Fraction of the remaining distance covered per smooth-scroll tick.
pub const SMOOTH_SCROLL_EASING: f64 = 0.35;

pub const DEFAULT_MESSAGE_START_PATTERN: &str =
    r"\d{1,4}-\d{1,2}-\d{1,2}\s+\d{1,2}:\d{1,2}:\d{1,2},\d{3}";
pub const TIMESTAMP_PATTERN: &str = r"\d{1,4}-\d{1,2}-\d{1,2}\s+\d{1,2}:\d{1,2}:\d{1,2},\d{3}";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

pub const DEFAULT_FILE_NAME_PATTERN: &str = r"\.log$";
pub const CONFIG_FILE: &str = ".logaudit.json";
pub const LOG_FILTER_ENV: &str = "LOGAUDIT_LOG";

/// Row counts above this turn a SQL result into a warning.
pub const SQL_ROW_COUNT_WARNING_THRESHOLD: u64 = 500_000;

pub const MISSING_ERROR_TEXT: &str = "Couldn't find error text";
pub const MISSING_FULL_ERROR_TEXT: &str = "Couldn't find full error message text";
pub const MISSING_QUERY_TEXT: &str = "Couldn't find SQL query text";
pub const MISSING_AGGREGATE_REASON: &str = "Couldn't find aggregate failure reason";
