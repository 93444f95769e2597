//! Once-a-day run time.

use crate::error::{Result, TrackerError};
use chrono::{Days, NaiveDateTime, NaiveTime};
use std::fmt;

/// A local wall-clock time at which the daily run fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
}

impl DailySchedule {
    pub fn new(time: NaiveTime) -> Self {
        Self { time }
    }

    /// Parse `HH:MM` (24-hour clock).
    pub fn parse(s: &str) -> Result<Self> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self::new)
            .map_err(|_| TrackerError::Config(format!("invalid query time {:?}, expected HH:MM", s)))
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// First run strictly after `now`.
    pub fn next_run_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.time);
        if today > now {
            today
        } else {
            now.date()
                .checked_add_days(Days::new(1))
                .map(|d| d.and_time(self.time))
                .unwrap_or(NaiveDateTime::MAX)
        }
    }

    /// Wall-clock wait from `now` until the next run.
    pub fn wait_from(&self, now: NaiveDateTime) -> std::time::Duration {
        (self.next_run_after(now) - now)
            .to_std()
            .unwrap_or_default()
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time.format("%H:%M"))
    }
}
