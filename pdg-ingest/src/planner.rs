//! Time-window planning for batched graph queries
//!
//! The full date range is covered by a fixed set of coarse windows. When a
//! window's query fails (usually because the endpoint gives up on result
//! sets that large), [`WindowPlanner::split`] derives smaller windows that
//! cover the same range.

use serde::{Deserialize, Serialize};

/// Label of the coarse window holding everything before 1400
pub const EARLIEST_WINDOW: &str = "pre-1400";

/// Label of the catch-all window for undated works
pub const UNDATED_WINDOW: &str = "no-date";

/// Exclusive upper bound of the dated range
pub const DATED_RANGE_END: i32 = 1970;

/// One slice of the query space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Human-readable label, `START-END` for closed year ranges
    pub name: String,
    /// SPARQL filter clause restricting the query to this window
    pub predicate: String,
}

impl TimeWindow {
    /// Window covering `start..=end`
    pub fn years(start: i32, end: i32) -> Self {
        Self {
            name: format!("{}-{}", start, end),
            predicate: year_range_filter(Some(start), end + 1),
        }
    }

    /// Window covering everything before `end_exclusive`
    pub fn before(end_exclusive: i32) -> Self {
        Self {
            name: format!("pre-{}", end_exclusive),
            predicate: year_range_filter(None, end_exclusive),
        }
    }

    /// Catch-all window for works with no inception date
    pub fn undated() -> Self {
        Self {
            name: UNDATED_WINDOW.to_string(),
            predicate: "FILTER(!BOUND(?inception))".to_string(),
        }
    }

    /// Closed year range encoded in the label, if any
    pub fn year_range(&self) -> Option<(i32, i32)> {
        parse_year_range(&self.name)
    }
}

fn year_range_filter(start: Option<i32>, end_exclusive: i32) -> String {
    match start {
        Some(start) => format!(
            "FILTER(YEAR(?inception) >= {} && YEAR(?inception) < {})",
            start, end_exclusive
        ),
        None => format!("FILTER(YEAR(?inception) < {})", end_exclusive),
    }
}

/// Parse a `START-END` label of two four-digit years
fn parse_year_range(name: &str) -> Option<(i32, i32)> {
    let (start, end) = name.split_once('-')?;
    let is_year = |s: &str| s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit());
    if !is_year(start) || !is_year(end) {
        return None;
    }
    let start: i32 = start.parse().ok()?;
    let end: i32 = end.parse().ok()?;
    (start <= end).then_some((start, end))
}

/// Produces initial windows and splits failed ones
#[derive(Debug, Clone)]
pub struct WindowPlanner {
    /// Smallest half-span a bisection may produce
    min_span_years: i32,
}

impl WindowPlanner {
    pub fn new(min_span_years: i32) -> Self {
        Self { min_span_years }
    }

    /// Non-overlapping windows covering all dates before 1970, plus undated
    pub fn initial_windows(&self) -> Vec<TimeWindow> {
        let mut windows = vec![TimeWindow::before(1400)];
        for start in (1400..1900).step_by(100) {
            windows.push(TimeWindow::years(start, start + 99));
        }
        windows.push(TimeWindow::years(1900, DATED_RANGE_END - 1));
        windows.push(TimeWindow::undated());
        windows
    }

    /// Split a window into smaller windows covering the same range
    ///
    /// A single-element result (the window itself) means the window cannot
    /// be split further: it is undated, or bisecting it would produce halves
    /// narrower than the configured floor.
    pub fn split(&self, window: &TimeWindow) -> Vec<TimeWindow> {
        if window.name == EARLIEST_WINDOW {
            return vec![
                TimeWindow::before(1200),
                TimeWindow::years(1200, 1299),
                TimeWindow::years(1300, 1399),
            ];
        }

        let Some((start, end)) = window.year_range() else {
            return vec![window.clone()];
        };

        let span = end - start + 1;
        let half = span / 2;
        if half < self.min_span_years {
            return vec![window.clone()];
        }

        let mid = start + half;
        vec![TimeWindow::years(start, mid - 1), TimeWindow::years(mid, end)]
    }
}

impl Default for WindowPlanner {
    fn default() -> Self {
        Self::new(10)
    }
}
