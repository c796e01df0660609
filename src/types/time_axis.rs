//! Fixed-step time axes. Every series produced for a request is aligned 1:1 with one of these.

use chrono::{DateTime, Datelike};
use std::ops::RangeInclusive;

pub const HOURLY_SECONDS: i64 = 3600;
pub const DAILY_SECONDS: i64 = 86400;

/// A half-open range of unix timestamps `[start, end)` sampled every `dt_seconds`.
///
/// # Examples
///
/// ```
/// use era5_archive::TimeAxis;
///
/// let day = TimeAxis::new(1_640_995_200, 1_641_081_600, 86400);
/// assert_eq!(day.count(), 1);
/// assert_eq!(day.with_dt(3600).count(), 24);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeAxis {
    pub start: i64,
    pub end: i64,
    pub dt_seconds: i64,
}

impl TimeAxis {
    pub fn new(start: i64, end: i64, dt_seconds: i64) -> Self {
        assert!(dt_seconds > 0, "time step must be positive");
        Self {
            start,
            end,
            dt_seconds,
        }
    }

    /// Number of samples on this axis.
    pub fn count(&self) -> usize {
        ((self.end - self.start) / self.dt_seconds).max(0) as usize
    }

    /// Same range, different step.
    pub fn with_dt(&self, dt_seconds: i64) -> Self {
        Self::new(self.start, self.end, dt_seconds)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.count()).map(move |i| self.start + i as i64 * self.dt_seconds)
    }

    /// Position of `timestamp` on the axis, if it falls exactly on a sample.
    pub fn index_of(&self, timestamp: i64) -> Option<usize> {
        if timestamp < self.start || timestamp >= self.end {
            return None;
        }
        let offset = timestamp - self.start;
        if offset % self.dt_seconds != 0 {
            return None;
        }
        Some((offset / self.dt_seconds) as usize)
    }

    /// Calendar years (UTC) touched by the axis.
    pub fn years(&self) -> RangeInclusive<i32> {
        let first = DateTime::from_timestamp(self.start, 0).map(|d| d.year());
        let last = DateTime::from_timestamp(self.end - 1, 0).map(|d| d.year());
        match (first, last) {
            (Some(first), Some(last)) if self.end > self.start => first..=last,
            // Empty range
            _ => 1..=0,
        }
    }
}

/// A resolved request range in UTC together with the UTC offset of the caller's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerangeLocal {
    /// Daily-stepped axis starting at local midnight of the first requested day.
    pub range: TimeAxis,
    pub utc_offset_seconds: i32,
}
