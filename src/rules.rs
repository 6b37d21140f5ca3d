//! Advisory checks on booking times.
//!
//! Violations are reported to the user next to the form; they never stop a
//! price from being computed.

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::interval::TimeInterval;

pub const MIN_DURATION_MINUTES: i64 = 30;
pub const MAX_DURATION_DAYS: i64 = 30;
pub const MAX_ADVANCE_DAYS: i64 = 365;

/// Bookings shorter than a day must start within 06:00-22:59 and end within
/// 06:00-23:59.
pub const BUSINESS_START_HOUR: u32 = 6;
pub const LAST_START_HOUR: u32 = 22;
pub const LAST_END_HOUR: u32 = 23;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleViolation {
    EndNotAfterStart,
    StartsInPast,
    TooFarAhead,
    TooLong,
    TooShort,
    StartOutsideBusinessHours,
    EndOutsideBusinessHours,
}

impl std::fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            RuleViolation::EndNotAfterStart => "End time must be after start time",
            RuleViolation::StartsInPast => "Booking cannot be scheduled in the past",
            RuleViolation::TooFarAhead => "Booking cannot be scheduled more than 1 year in advance",
            RuleViolation::TooLong => "Bookings cannot exceed 30 days",
            RuleViolation::TooShort => "Bookings must be at least 30 minutes long",
            RuleViolation::StartOutsideBusinessHours => {
                "Same-day bookings must start within business hours (6 AM - 10 PM)"
            }
            RuleViolation::EndOutsideBusinessHours => {
                "Same-day bookings must end within business hours (6 AM - 11 PM)"
            }
        };
        f.write_str(msg)
    }
}

/// Check raw start/end times against the booking rules, as of `now`.
///
/// Durations are counted in whole days, rounded down: 30 days and some hours
/// is not too long, and any booking under a day is held to business hours even
/// when it runs past midnight.
pub fn check_booking_times(
    start: NaiveDateTime,
    end: NaiveDateTime,
    now: NaiveDateTime,
) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    if end <= start {
        violations.push(RuleViolation::EndNotAfterStart);
    }
    if start < now {
        violations.push(RuleViolation::StartsInPast);
    }
    if start > now + Duration::days(MAX_ADVANCE_DAYS) {
        violations.push(RuleViolation::TooFarAhead);
    }

    // whole days, floored, so an inverted interval counts as -1
    let duration = end - start;
    let days = duration.num_seconds().div_euclid(SECONDS_PER_DAY);
    if days > MAX_DURATION_DAYS {
        violations.push(RuleViolation::TooLong);
    }

    if days == 0 {
        if !(BUSINESS_START_HOUR..=LAST_START_HOUR).contains(&start.hour()) {
            violations.push(RuleViolation::StartOutsideBusinessHours);
        }
        if !(BUSINESS_START_HOUR..=LAST_END_HOUR).contains(&end.hour()) {
            violations.push(RuleViolation::EndOutsideBusinessHours);
        }
    }

    if duration < Duration::minutes(MIN_DURATION_MINUTES) {
        violations.push(RuleViolation::TooShort);
    }

    violations
}

pub fn check_interval(interval: &TimeInterval, now: NaiveDateTime) -> Vec<RuleViolation> {
    check_booking_times(interval.start(), interval.end(), now)
}
