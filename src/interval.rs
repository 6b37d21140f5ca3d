//! Booking time intervals.

use chrono::{Duration, NaiveDateTime};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format used by `datetime-local` form inputs and the availability endpoint.
pub const FORM_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

const SECONDS_PER_HOUR: i64 = 3600;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    #[error("End time must be after start time")]
    EndNotAfterStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, IntervalError> {
        if end <= start {
            return Err(IntervalError::EndNotAfterStart);
        }
        Ok(Self { start, end })
    }

    /// Build an interval from raw form text.
    pub fn parse(start: &str, end: &str) -> Result<Self, IntervalError> {
        Self::new(parse_datetime(start)?, parse_datetime(end)?)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Length in fractional hours, exact to the microsecond.
    pub fn duration_hours(&self) -> Decimal {
        hours_between(self.start, self.end)
    }

    pub fn is_same_day(&self) -> bool {
        self.start.date() == self.end.date()
    }
}

/// Signed fractional hours from `start` to `end`; negative when `end` precedes `start`.
pub fn hours_between(start: NaiveDateTime, end: NaiveDateTime) -> Decimal {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(micros) => Decimal::new(micros, 6) / Decimal::from(SECONDS_PER_HOUR),
        None => Decimal::from(delta.num_seconds()) / Decimal::from(SECONDS_PER_HOUR),
    }
}

/// Parse form datetime text. Accepts `YYYY-MM-DDTHH:MM` with optional seconds.
pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime, IntervalError> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, FORM_DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .map_err(|_| IntervalError::InvalidDatetime(raw.to_string()))
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format(FORM_DATETIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_duration() {
        let interval = TimeInterval::parse("2025-06-01T09:00", "2025-06-01T12:30").unwrap();
        assert_eq!(interval.duration_hours(), Decimal::new(35, 1));
        assert!(interval.is_same_day());
        assert_eq!(format_datetime(interval.start()), "2025-06-01T09:00");
    }

    #[test]
    fn test_rejects_inverted_and_empty_intervals() {
        assert_eq!(
            TimeInterval::parse("2025-06-01T12:00", "2025-06-01T09:00"),
            Err(IntervalError::EndNotAfterStart)
        );
        assert_eq!(
            TimeInterval::parse("2025-06-01T09:00", "2025-06-01T09:00"),
            Err(IntervalError::EndNotAfterStart)
        );
        assert!(matches!(
            TimeInterval::parse("", "2025-06-01T09:00"),
            Err(IntervalError::InvalidDatetime(_))
        ));
    }

    #[test]
    fn test_fractional_hours_are_exact() {
        let start = parse_datetime("2025-06-01T09:00").unwrap();
        let end = start + Duration::milliseconds(4 * 3_600_000 + 360);
        assert_eq!(hours_between(start, end), Decimal::new(40001, 4));
        assert_eq!(hours_between(end, start), Decimal::new(-40001, 4));
    }
}
