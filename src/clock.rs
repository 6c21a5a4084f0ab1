//! Clock text and the hourly dashboard frame refresh.

use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tokio::time::Instant;

/// Wall-clock time between reloads of the embedded dashboard frame.
pub const FRAME_REFRESH_PERIOD: Duration = Duration::from_secs(3600);

/// Clock cadence while the screensaver is up.
pub const CLOCK_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Rendered clock text.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ClockReading {
    /// 24-hour "HH:MM".
    pub time: String,
    /// Long-form date, e.g. "Sunday, October 18, 2026".
    pub date: String,
}

impl ClockReading {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self { time: now.format("%H:%M").to_string(), date: now.format("%A, %B %-d, %Y").to_string() }
    }

    pub fn now() -> Self {
        Self::at(&Local::now())
    }
}

/// Tracks time since the dashboard frame was last reloaded.
///
/// The reference point survives mode transitions: entering and leaving the screensaver
/// does not restart the hour.
#[derive(Debug, Clone)]
pub struct FrameRefreshTracker {
    last_refresh: Instant,
    period: Duration,
}

impl FrameRefreshTracker {
    pub fn new(now: Instant) -> Self {
        Self::with_period(now, FRAME_REFRESH_PERIOD)
    }

    pub fn with_period(now: Instant, period: Duration) -> Self {
        Self { last_refresh: now, period }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_refresh)
    }

    /// Returns true and restarts the period if a refresh is due at `now`.
    pub fn check(&mut self, now: Instant) -> bool {
        if self.elapsed(now) >= self.period {
            self.last_refresh = now;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn reading_uses_24_hour_time_and_long_date() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let moment = tz.with_ymd_and_hms(2026, 10, 18, 21, 5, 9).unwrap();
        let reading = ClockReading::at(&moment);
        assert_eq!(reading.time, "21:05");
        assert_eq!(reading.date, "Sunday, October 18, 2026");
    }

    #[test]
    fn single_digit_day_is_not_padded() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let moment = tz.with_ymd_and_hms(2026, 3, 4, 7, 0, 0).unwrap();
        assert_eq!(ClockReading::at(&moment).date, "Wednesday, March 4, 2026");
        assert_eq!(ClockReading::at(&moment).time, "07:00");
    }

    #[test]
    fn refresh_is_due_after_an_hour_and_then_resets() {
        let start = Instant::now();
        let mut tracker = FrameRefreshTracker::new(start);
        assert!(!tracker.check(start + Duration::from_secs(3599)));
        assert!(tracker.check(start + Duration::from_secs(3600)));
        assert!(!tracker.check(start + Duration::from_secs(3601)));
        assert!(tracker.check(start + Duration::from_secs(7200)));
    }
}
