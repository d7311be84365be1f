//! Tick schedule: every window boundary plus a fixed offset.

use std::time::Duration;

use chrono::{DateTime, Utc};
use faultline_core::{Granularity, TimeWindow};

/// First tick strictly after `now`.
///
/// A tick is a window boundary plus `offset`, so with an hourly granularity
/// and a five-minute offset the worker fires at minute 5 of every hour and
/// each run covers the hour that just closed.
pub fn next_tick(now: DateTime<Utc>, granularity: Granularity, offset: Duration) -> DateTime<Utc> {
    let offset = chrono::Duration::from_std(offset).unwrap_or_else(|_| chrono::Duration::zero());
    let boundary = TimeWindow::compute(now, granularity).to();
    let tick = boundary + offset;
    if tick > now {
        tick
    } else {
        tick + granularity.as_duration()
    }
}

/// How long to sleep from `now` until `tick`; zero if it already passed.
pub fn until(now: DateTime<Utc>, tick: DateTime<Utc>) -> Duration {
    (tick - now).to_std().unwrap_or(Duration::ZERO)
}
