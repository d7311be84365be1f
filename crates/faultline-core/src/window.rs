//! Time windows for a single run.
//!
//! A run is responsible for the half-open interval `[from, to)` that ends at
//! the most recent granularity boundary at or before "now". Consecutive runs
//! one granularity apart therefore abut exactly: no gap, no overlap.

use std::fmt;
use std::num::NonZeroU32;

use chrono::{DateTime, Duration, Utc};

/// Width of a window, in whole seconds. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Granularity(NonZeroU32);

impl Granularity {
    pub const MINUTE: Granularity = Granularity(match NonZeroU32::new(60) {
        Some(n) => n,
        None => unreachable!(),
    });

    pub const HOUR: Granularity = Granularity(match NonZeroU32::new(3600) {
        Some(n) => n,
        None => unreachable!(),
    });

    /// Returns `None` for a zero-width granularity.
    pub fn from_secs(secs: u32) -> Option<Self> {
        NonZeroU32::new(secs).map(Granularity)
    }

    pub fn as_secs(&self) -> u32 {
        self.0.get()
    }

    pub fn as_duration(&self) -> Duration {
        Duration::seconds(i64::from(self.0.get()))
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::HOUR
    }
}

/// Half-open interval `[from, to)`, both ends aligned to the granularity
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl TimeWindow {
    /// Compute the window for a run happening at `now`.
    ///
    /// `to` is `now` truncated down to a multiple of `granularity` (counted
    /// from the Unix epoch) and `from = to - granularity`.
    pub fn compute(now: DateTime<Utc>, granularity: Granularity) -> Self {
        let step = i64::from(granularity.as_secs());
        let secs = now.timestamp();
        let aligned = secs - secs.rem_euclid(step);

        let to = DateTime::from_timestamp(aligned, 0).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let from = to
            .checked_sub_signed(granularity.as_duration())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        Self { from, to }
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn duration(&self) -> Duration {
        self.to - self.from
    }

    /// Whether `t` falls inside `[from, to)`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.from <= t && t < self.to
    }

    /// The window immediately after this one.
    pub fn next(&self) -> Self {
        let width = self.duration();
        Self {
            from: self.to,
            to: self.to + width,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.from.format("%Y-%m-%d %H:%M:%S"),
            self.to.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_hourly_window_truncates_to_previous_hour() {
        let w = TimeWindow::compute(at(2024, 3, 1, 5, 5, 0), Granularity::HOUR);
        assert_eq!(w.from(), at(2024, 3, 1, 4, 0, 0));
        assert_eq!(w.to(), at(2024, 3, 1, 5, 0, 0));
    }

    #[test]
    fn test_window_on_exact_boundary() {
        let w = TimeWindow::compute(at(2024, 3, 1, 5, 0, 0), Granularity::HOUR);
        assert_eq!(w.to(), at(2024, 3, 1, 5, 0, 0));
        assert_eq!(w.from(), at(2024, 3, 1, 4, 0, 0));
    }

    #[test]
    fn test_subsecond_now_is_truncated() {
        let now = at(2024, 3, 1, 5, 59, 59) + Duration::milliseconds(999);
        let w = TimeWindow::compute(now, Granularity::HOUR);
        assert_eq!(w.to(), at(2024, 3, 1, 5, 0, 0));
    }

    #[test]
    fn test_window_crosses_midnight() {
        let w = TimeWindow::compute(at(2024, 3, 2, 0, 5, 0), Granularity::HOUR);
        assert_eq!(w.from(), at(2024, 3, 1, 23, 0, 0));
        assert_eq!(w.to(), at(2024, 3, 2, 0, 0, 0));
    }

    #[test]
    fn test_consecutive_windows_abut() {
        let granularities = [
            Granularity::MINUTE,
            Granularity::HOUR,
            Granularity::from_secs(900).unwrap(),
            Granularity::from_secs(7).unwrap(),
        ];
        for g in granularities {
            let mut now = at(2024, 2, 28, 22, 17, 43);
            let mut prev = TimeWindow::compute(now, g);
            for _ in 0..100 {
                now += g.as_duration();
                let w = TimeWindow::compute(now, g);
                assert_eq!(prev.to(), w.from(), "gap or overlap at {:?}", g);
                assert_eq!(w.duration(), g.as_duration());
                assert_eq!(prev.next(), w);
                prev = w;
            }
        }
    }

    #[test]
    fn test_window_excludes_now() {
        let now = at(2024, 3, 1, 5, 30, 0);
        let w = TimeWindow::compute(now, Granularity::HOUR);
        assert!(!w.contains(now));
        assert!(w.contains(w.from()));
        assert!(!w.contains(w.to()));
    }

    #[test]
    fn test_before_epoch() {
        let now = at(1969, 12, 31, 23, 30, 0);
        let w = TimeWindow::compute(now, Granularity::HOUR);
        assert_eq!(w.to(), at(1969, 12, 31, 23, 0, 0));
        assert_eq!(w.from(), at(1969, 12, 31, 22, 0, 0));
    }

    #[test]
    fn test_zero_granularity_rejected() {
        assert!(Granularity::from_secs(0).is_none());
        assert_eq!(Granularity::from_secs(3600), Some(Granularity::HOUR));
        assert_eq!(Granularity::default(), Granularity::HOUR);
    }

    #[test]
    fn test_display() {
        let w = TimeWindow::compute(at(2024, 3, 1, 5, 5, 0), Granularity::HOUR);
        assert_eq!(w.to_string(), "[2024-03-01 04:00:00, 2024-03-01 05:00:00)");
    }
}
