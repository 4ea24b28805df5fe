//! Distance and open/closed primitives
//!
//! Everything here is a pure function of its inputs; "now" is always passed in
//! as a `NaiveTime` so callers decide which clock they trust.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::domain::{Hours, Location};

/// Mean Earth radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Walking pace used for time estimates (minutes per mile, ~3 mph)
pub const WALK_MINUTES_PER_MILE: f64 = 20.0;

/// Minutes before close at which an open venue counts as closing soon
pub const CLOSING_SOON_MINUTES: i64 = 45;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Great-circle distance in miles, `None` when either point is not finite
pub fn haversine_miles(a: Location, b: Location) -> Option<f64> {
    if !a.is_finite() || !b.is_finite() {
        return None;
    }
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    let miles = EARTH_RADIUS_MILES * c;
    miles.is_finite().then_some(miles)
}

/// Walking minutes for a distance, `None` for unknown distances
pub fn minutes_walk(miles: Option<f64>) -> Option<u32> {
    let miles = miles.filter(|m| m.is_finite() && *m >= 0.0)?;
    Some((miles * WALK_MINUTES_PER_MILE).round() as u32)
}

/// Fractional hour of day (`13.5` at 13:30); seconds are ignored
pub fn hour_of_day(at: NaiveTime) -> f64 {
    at.hour() as f64 + at.minute() as f64 / 60.0
}

/// Minutes from `at` until the next occurrence of `hour24`, wrapping past midnight
pub fn minutes_until(hour24: f64, at: NaiveTime) -> i64 {
    let whole = hour24.floor();
    let target_minutes = whole as i64 * 60 + ((hour24 - whole) * 60.0).round() as i64;
    let now_seconds = at.num_seconds_from_midnight() as i64;
    let mut diff = ((target_minutes * 60 - now_seconds) as f64 / 60.0).round() as i64;
    if diff < 0 {
        diff += MINUTES_PER_DAY;
    }
    diff
}

/// Schedule-derived status of a venue at a given time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum OpenStatus {
    Open,
    ClosingSoon { minutes: u32 },
    Closed,
}

impl OpenStatus {
    /// Contribution to the score
    pub fn weight(&self) -> f64 {
        match self {
            Self::Open => 1.0,
            Self::ClosingSoon { .. } => -0.5,
            Self::Closed => -2.0,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Open => "Open".to_string(),
            Self::ClosingSoon { minutes } => format!("Closes in {}m", minutes),
            Self::Closed => "Closed".to_string(),
        }
    }
}

impl std::fmt::Display for OpenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Whether `at` falls inside `[open, close)`, treating `open >= close` as overnight
pub fn is_within(hours: &Hours, at: NaiveTime) -> bool {
    if !hours.open.is_finite() || !hours.close.is_finite() {
        return false;
    }
    let hour = hour_of_day(at);
    if hours.open < hours.close {
        hour >= hours.open && hour < hours.close
    } else {
        hour >= hours.open || hour < hours.close
    }
}

/// Status of a schedule at `at`
pub fn open_status(hours: &Hours, at: NaiveTime) -> OpenStatus {
    if !is_within(hours, at) {
        return OpenStatus::Closed;
    }
    let minutes = minutes_until(hours.close, at);
    if minutes <= CLOSING_SOON_MINUTES {
        OpenStatus::ClosingSoon {
            minutes: minutes.max(0) as u32,
        }
    } else {
        OpenStatus::Open
    }
}
