//! Half-open reservation windows.
//!
//! A window `[start_at, end_at)` occupies its start instant but not its end,
//! so two bookings that touch (`a.end_at == b.start_at`) never overlap.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// A half-open time interval `[start_at, end_at)` with `end_at > start_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting empty or inverted intervals.
    pub fn new(start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Result<Self> {
        if end_at <= start_at {
            return Err(Error::validation("endAt must be after startAt"));
        }
        Ok(Self { start_at, end_at })
    }

    /// Half-open overlap: `[s1,e1)` and `[s2,e2)` overlap iff `s1 < e2 && s2 < e1`.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start_at < other.end_at && other.start_at < self.end_at
    }

    /// Widen the window by an item's setup/teardown buffers. The widened
    /// window is the interval during which the physical unit is actually
    /// occupied, and is what overlap checks must compare.
    pub fn widened(&self, buffer_before_min: i32, buffer_after_min: i32) -> TimeWindow {
        TimeWindow {
            start_at: self.start_at - Duration::minutes(i64::from(buffer_before_min)),
            end_at: self.end_at + Duration::minutes(i64::from(buffer_after_min)),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_at - self.start_at
    }
}
