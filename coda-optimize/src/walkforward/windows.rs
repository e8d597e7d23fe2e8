//! Rolling train/test window generation.
//!
//! Windows advance by a fixed step in calendar months. A window whose
//! test period would run past the overall end date is dropped, never
//! truncated.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evolve::EvolveError;

/// Walk-forward failures.
#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("start date {start} must be before end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("{0} must be greater than zero")]
    ZeroMonths(&'static str),

    #[error(
        "date range {start}..{end} is too short for a {train_months}mo train / {test_months}mo test window"
    )]
    NoWindows {
        start: NaiveDate,
        end: NaiveDate,
        train_months: u32,
        test_months: u32,
    },

    #[error(transparent)]
    Evolve(#[from] EvolveError),
}

/// A single train/test split.
///
/// Invariants: `test_start` is exactly one day after `train_end`, and
/// `test_end` never exceeds the configured overall end date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardWindow {
    /// Window index, starting at zero.
    pub window_id: usize,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
}

impl WalkForwardWindow {
    /// Training period length in days.
    pub fn train_days(&self) -> i64 {
        (self.train_end - self.train_start).num_days()
    }

    /// Test period length in days.
    pub fn test_days(&self) -> i64 {
        (self.test_end - self.test_start).num_days()
    }
}

/// Window-generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    /// Training period length in months.
    pub train_months: u32,

    /// Test period length in months.
    pub test_months: u32,

    /// Months to roll forward between consecutive windows.
    pub step_months: u32,

    /// Optional cap applied after generation.
    #[serde(default)]
    pub max_windows: Option<usize>,
}

impl WindowConfig {
    /// Validate before generating anything.
    pub fn validate(&self) -> Result<(), WalkForwardError> {
        if self.start_date >= self.end_date {
            return Err(WalkForwardError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.train_months == 0 {
            return Err(WalkForwardError::ZeroMonths("train_months"));
        }
        if self.test_months == 0 {
            return Err(WalkForwardError::ZeroMonths("test_months"));
        }
        if self.step_months == 0 {
            return Err(WalkForwardError::ZeroMonths("step_months"));
        }
        Ok(())
    }

    /// Generate the full window list.
    ///
    /// Fails explicitly when the date range cannot fit even one
    /// window; an empty plan is never returned as success.
    pub fn generate(&self) -> Result<Vec<WalkForwardWindow>, WalkForwardError> {
        self.validate()?;

        let mut windows = Vec::new();
        let mut train_start = self.start_date;
        let mut window_id = 0;

        loop {
            let train_end = add_months(train_start, self.train_months as i32);
            let test_start = train_end + Duration::days(1);
            let test_end = add_months(test_start, self.test_months as i32);

            if test_end > self.end_date {
                break;
            }

            windows.push(WalkForwardWindow {
                window_id,
                train_start,
                train_end,
                test_start,
                test_end,
            });
            window_id += 1;

            train_start = add_months(train_start, self.step_months as i32);
        }

        if let Some(cap) = self.max_windows {
            windows.truncate(cap);
        }

        if windows.is_empty() {
            return Err(WalkForwardError::NoWindows {
                start: self.start_date,
                end: self.end_date,
                train_months: self.train_months,
                test_months: self.test_months,
            });
        }

        Ok(windows)
    }
}

/// Add calendar months to a date, clamping the day to the target month.
fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 + months;

    while month > 12 {
        year += 1;
        month -= 12;
    }
    while month < 1 {
        year -= 1;
        month += 12;
    }

    // Handle day overflow (e.g., Jan 31 + 1 month)
    let day = date.day().min(days_in_month(year, month as u32));
    NaiveDate::from_ymd_opt(year, month as u32, day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config() -> WindowConfig {
        WindowConfig {
            start_date: date(2020, 1, 1),
            end_date: date(2023, 1, 1),
            train_months: 12,
            test_months: 6,
            step_months: 6,
            max_windows: None,
        }
    }

    #[test]
    fn test_window_invariants() {
        let windows = config().generate().unwrap();
        assert!(!windows.is_empty());

        for window in &windows {
            assert_eq!(window.test_start, window.train_end + Duration::days(1));
            assert_eq!(
                window.test_end,
                add_months(window.test_start, 6)
            );
            assert!(window.test_end <= date(2023, 1, 1));
        }
    }

    #[test]
    fn test_window_schedule() {
        let windows = config().generate().unwrap();
        assert_eq!(windows.len(), 3);

        assert_eq!(windows[0].train_start, date(2020, 1, 1));
        assert_eq!(windows[0].train_end, date(2021, 1, 1));
        assert_eq!(windows[0].test_start, date(2021, 1, 2));
        assert_eq!(windows[0].test_end, date(2021, 7, 2));

        // Steps advance from each window's train_start, not its end.
        assert_eq!(windows[1].train_start, date(2020, 7, 1));
        assert_eq!(windows[2].train_start, date(2021, 1, 1));
        assert_eq!(windows[2].window_id, 2);
    }

    #[test]
    fn test_last_window_dropped_not_truncated() {
        let windows = config().generate().unwrap();
        // The next candidate would test through 2023-01-02, past the
        // end date, so generation stops at three windows.
        let last = windows.last().unwrap();
        assert_eq!(last.test_end, date(2022, 7, 2));
    }

    #[test]
    fn test_max_windows_cap() {
        let cfg = WindowConfig {
            max_windows: Some(1),
            ..config()
        };
        let windows = cfg.generate().unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].window_id, 0);
    }

    #[test]
    fn test_too_short_range_is_an_error() {
        let cfg = WindowConfig {
            start_date: date(2020, 1, 1),
            end_date: date(2020, 12, 1),
            ..config()
        };
        assert!(matches!(
            cfg.generate(),
            Err(WalkForwardError::NoWindows { .. })
        ));
    }

    #[test]
    fn test_zero_step_rejected() {
        let cfg = WindowConfig {
            step_months: 0,
            ..config()
        };
        assert!(matches!(
            cfg.generate(),
            Err(WalkForwardError::ZeroMonths("step_months"))
        ));
    }

    #[test]
    fn test_add_months_clamps_day_overflow() {
        assert_eq!(add_months(date(2020, 1, 31), 1), date(2020, 2, 29));
        assert_eq!(add_months(date(2021, 1, 31), 1), date(2021, 2, 28));
        assert_eq!(add_months(date(2020, 11, 15), 3), date(2021, 2, 15));
    }
}
