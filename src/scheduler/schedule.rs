// Recurrence rules for background tasks.
//
// `next_after` is a pure function of the input instant, so task timing
// is testable with fixed clocks and never depends on when the process
// happened to start.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};

/// When a background task recurs. Hours are UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Top of every hour
    Hourly,
    /// Every day at `hour`:00
    Daily { hour: u32 },
    /// Every `weekday` at `hour`:00
    Weekly { weekday: Weekday, hour: u32 },
    /// Day `day` of every month at `hour`:00
    Monthly { day: u32, hour: u32 },
}

impl Cadence {
    /// The first scheduled instant strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Cadence::Hourly => {
                let top_of_hour = after
                    .date_naive()
                    .and_hms_opt(after.hour(), 0, 0)
                    .unwrap_or_default()
                    .and_utc();
                top_of_hour + Duration::hours(1)
            }
            Cadence::Daily { hour } => {
                let today = at_hour(after, hour);
                if today > after {
                    today
                } else {
                    today + Duration::days(1)
                }
            }
            Cadence::Weekly { weekday, hour } => {
                let days_ahead = i64::from(
                    (7 + weekday.num_days_from_monday()
                        - after.weekday().num_days_from_monday())
                        % 7,
                );
                let candidate = at_hour(after, hour) + Duration::days(days_ahead);
                if candidate > after {
                    candidate
                } else {
                    candidate + Duration::days(7)
                }
            }
            Cadence::Monthly { day, hour } => {
                let mut year = after.year();
                let mut month = after.month();
                loop {
                    if let Some(candidate) =
                        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).single()
                    {
                        if candidate > after {
                            return candidate;
                        }
                    }
                    if month == 12 {
                        year += 1;
                        month = 1;
                    } else {
                        month += 1;
                    }
                }
            }
        }
    }
}

/// The same calendar day as `after`, at `hour`:00:00 UTC
fn at_hour(after: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    after
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .unwrap_or_default()
        .and_utc()
}
