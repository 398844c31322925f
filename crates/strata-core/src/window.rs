//! Trailing query windows.

/// Fixed trailing window relative to query execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    FiveMinutes,
    OneHour,
    TwentyFourHours,
}

impl TimeWindow {
    /// Postgres interval literal, e.g. `'1 hour'`.
    pub fn sql_interval(self) -> &'static str {
        match self {
            TimeWindow::FiveMinutes => "5 minutes",
            TimeWindow::OneHour => "1 hour",
            TimeWindow::TwentyFourHours => "24 hours",
        }
    }

    /// `timestamp > NOW() - INTERVAL '...'` predicate for this window.
    pub fn predicate(self) -> String {
        format!("timestamp > NOW() - INTERVAL '{}'", self.sql_interval())
    }
}
