//! Date watermark with a fixed out-of-order slack.
//!
//! Unlike a bounded-lateness generator that trails the maximum timestamp seen,
//! this watermark jumps straight to a record's bucket date, and only once that
//! date lies more than the slack ahead of it. Dates within the slack on either
//! side leave it untouched; dates further behind are a window violation.

use chrono::{Days, NaiveDate};

use crate::constants::WINDOW_SLACK_DAYS;

/// Result of observing one bucket date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkStep {
    /// The watermark moved; buckets older than `previous` are complete.
    Advanced { previous: NaiveDate },
    /// The date is within the slack of the watermark.
    Held,
    /// The date lies more than the slack behind the watermark.
    Regressed { watermark: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWatermark {
    current: NaiveDate,
    slack: Days,
}

impl DateWatermark {
    #[must_use]
    pub fn new() -> Self {
        Self::with_slack_days(WINDOW_SLACK_DAYS)
    }

    #[must_use]
    pub fn with_slack_days(days: u64) -> Self {
        Self {
            current: NaiveDate::MIN,
            slack: Days::new(days),
        }
    }

    #[must_use]
    pub fn current(&self) -> NaiveDate {
        self.current
    }

    /// Compare `date` against the watermark, advancing it when `date` is ahead
    /// by more than the slack.
    pub fn observe(&mut self, date: NaiveDate) -> WatermarkStep {
        let upper = self
            .current
            .checked_add_days(self.slack)
            .unwrap_or(NaiveDate::MAX);
        if date > upper {
            let previous = self.current;
            self.current = date;
            return WatermarkStep::Advanced { previous };
        }
        match self.current.checked_sub_days(self.slack) {
            Some(lower) if date < lower => WatermarkStep::Regressed {
                watermark: self.current,
            },
            _ => WatermarkStep::Held,
        }
    }
}

impl Default for DateWatermark {
    fn default() -> Self {
        Self::new()
    }
}
