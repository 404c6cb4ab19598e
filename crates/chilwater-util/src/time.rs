//! Time utilities for chilwater
//!
//! Provides both monotonic time (for draining pump accumulators) and
//! wall-clock time (for rule windows and the once-per-day bookkeeping).
//!
//! # Mock Time for Development
//!
//! In debug builds, the `CHILWATER_MOCK_TIME` environment variable can be set
//! to override the system time for all wall-clock decisions. This is useful
//! for exercising rule windows without waiting for the morning.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-06-21 06:29:50`)
//!
//! Example:
//! ```bash
//! CHILWATER_MOCK_TIME="2025-06-21 06:29:50" chilwaterd --simulate
//! ```

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "CHILWATER_MOCK_TIME";

/// Default interval between two iterations of every polling loop
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => {
                        if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                            let offset = mock_dt.signed_duration_since(chrono::Local::now());
                            tracing::info!(
                                mock_time = %mock_time_str,
                                offset_secs = offset.num_seconds(),
                                "Mock time enabled"
                            );
                            return Some(offset);
                        }
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        );
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Format a DateTime for logs and status output.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Represents a point in monotonic time.
/// This is immune to wall-clock changes, which matters for pump run time:
/// an NTP step must not make a pump run for an hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    /// Duration since `earlier`, zero if `earlier` is later than `self`
    pub fn duration_since(&self, earlier: MonotonicInstant) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }
}

impl std::ops::Add<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        MonotonicInstant(self.0 + rhs)
    }
}

/// Error parsing a time of day
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("expected HH:MM or HH:MM:SS")]
    Format,

    #[error("hour must be 0-23")]
    Hour,

    #[error("minute must be 0-59")]
    Minute,

    #[error("second must be 0-59")]
    Second,
}

/// Time of day with second resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallClock {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl WallClock {
    pub const MIDNIGHT: Self = Self {
        hour: 0,
        minute: 0,
        second: 0,
    };

    pub fn new(hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour < 24 && minute < 60 && second < 60 {
            Some(Self {
                hour,
                minute,
                second,
            })
        } else {
            None
        }
    }

    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            // Leap seconds are reported as second 59
            second: time.second().min(59) as u8,
        }
    }

    /// Returns seconds since midnight
    pub fn as_seconds_from_midnight(&self) -> u32 {
        (self.hour as u32) * 3600 + (self.minute as u32) * 60 + self.second as u32
    }
}

impl PartialOrd for WallClock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WallClock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_seconds_from_midnight()
            .cmp(&other.as_seconds_from_midnight())
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

impl FromStr for WallClock {
    type Err = TimeParseError;

    /// Parses `HH:MM` or `HH:MM:SS`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(TimeParseError::Format);
        }

        let hour: u8 = parts[0].parse().map_err(|_| TimeParseError::Format)?;
        let minute: u8 = parts[1].parse().map_err(|_| TimeParseError::Format)?;
        let second: u8 = match parts.get(2) {
            Some(sec) => sec.parse().map_err(|_| TimeParseError::Format)?,
            None => 0,
        };

        if hour >= 24 {
            return Err(TimeParseError::Hour);
        }
        if minute >= 60 {
            return Err(TimeParseError::Minute);
        }
        if second >= 60 {
            return Err(TimeParseError::Second);
        }

        Ok(Self {
            hour,
            minute,
            second,
        })
    }
}

/// A time-of-day range, repeating every day, with both ends inclusive.
///
/// Windows do not wrap around midnight: a window whose `from` lies after its
/// `to` contains no time at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWindow {
    pub from: WallClock,
    pub to: WallClock,
}

impl DailyWindow {
    pub fn new(from: WallClock, to: WallClock) -> Self {
        Self { from, to }
    }

    /// Check if the time of day of `dt` falls within this window
    pub fn contains(&self, dt: &DateTime<Local>) -> bool {
        self.contains_time(WallClock::from_naive_time(dt.time()))
    }

    pub fn contains_time(&self, time: WallClock) -> bool {
        self.from <= time && time <= self.to
    }
}

impl fmt::Display for DailyWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wc(h: u8, m: u8, s: u8) -> WallClock {
        WallClock::new(h, m, s).unwrap()
    }

    #[test]
    fn test_wall_clock_ordering() {
        assert!(wc(8, 0, 0) < wc(12, 0, 0));
        assert!(wc(12, 0, 0) < wc(12, 0, 1));
        assert!(wc(6, 59, 59) < wc(7, 0, 0));
    }

    #[test]
    fn test_wall_clock_rejects_out_of_range() {
        assert!(WallClock::new(24, 0, 0).is_none());
        assert!(WallClock::new(0, 60, 0).is_none());
        assert!(WallClock::new(0, 0, 60).is_none());
    }

    #[test]
    fn test_parse_wall_clock() {
        assert_eq!("06:30".parse::<WallClock>().unwrap(), wc(6, 30, 0));
        assert_eq!("23:59:59".parse::<WallClock>().unwrap(), wc(23, 59, 59));
        assert_eq!("00:00:00".parse::<WallClock>().unwrap(), wc(0, 0, 0));

        assert_eq!("24:00".parse::<WallClock>(), Err(TimeParseError::Hour));
        assert_eq!("12:60".parse::<WallClock>(), Err(TimeParseError::Minute));
        assert_eq!("12:00:61".parse::<WallClock>(), Err(TimeParseError::Second));
        assert_eq!("noon".parse::<WallClock>(), Err(TimeParseError::Format));
        assert_eq!("1:2:3:4".parse::<WallClock>(), Err(TimeParseError::Format));
    }

    #[test]
    fn test_wall_clock_display_round_trips() {
        let t = wc(7, 5, 9);
        assert_eq!(t.to_string(), "07:05:09");
        assert_eq!(t.to_string().parse::<WallClock>().unwrap(), t);
    }

    #[test]
    fn test_daily_window_bounds_are_inclusive() {
        let window = DailyWindow::new(wc(6, 0, 0), wc(7, 0, 0));

        assert!(window.contains_time(wc(6, 0, 0)));
        assert!(window.contains_time(wc(6, 30, 0)));
        assert!(window.contains_time(wc(7, 0, 0)));
        assert!(!window.contains_time(wc(5, 59, 59)));
        assert!(!window.contains_time(wc(7, 0, 1)));
    }

    #[test]
    fn test_daily_window_contains_datetime() {
        let window = DailyWindow::new(wc(14, 0, 0), wc(18, 0, 0));

        let in_window = Local.with_ymd_and_hms(2025, 6, 21, 15, 0, 0).unwrap();
        assert!(window.contains(&in_window));

        let before = Local.with_ymd_and_hms(2025, 6, 21, 10, 0, 0).unwrap();
        assert!(!window.contains(&before));
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let window = DailyWindow::new(wc(22, 0, 0), wc(2, 0, 0));
        assert!(!window.contains_time(wc(23, 0, 0)));
        assert!(!window.contains_time(wc(1, 0, 0)));
    }

    #[test]
    fn test_monotonic_instant() {
        let t1 = MonotonicInstant::now();
        let t2 = t1 + Duration::from_millis(250);

        assert!(t2 > t1);
        assert_eq!(t2.duration_since(t1), Duration::from_millis(250));
        assert_eq!(t1.duration_since(t2), Duration::ZERO);
    }

    #[test]
    fn test_format_datetime_full() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(format_datetime_full(&dt), "2025-12-25 14:30:45");
    }

    #[test]
    fn test_now_consistency() {
        let t1 = now();
        std::thread::sleep(Duration::from_millis(20));
        let t2 = now();
        assert!(t2 > t1, "Time should advance forward");
    }

    #[test]
    fn test_mock_time_format_parses() {
        let example = "2025-06-21 06:29:50";
        assert!(NaiveDateTime::parse_from_str(example, "%Y-%m-%d %H:%M:%S").is_ok());
        assert_eq!(MOCK_TIME_ENV_VAR, "CHILWATER_MOCK_TIME");
    }
}
