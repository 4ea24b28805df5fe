//! Scoring engine
//!
//! `score` is a pure function of `(candidate, profile, evaluation time)`. The
//! open/closed contribution always comes from the candidate's schedule, never
//! from the provider's live "open now" flag; the live flag only affects
//! [`display_status`].

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Candidate, PreferenceProfile};
use crate::geo::{self, OpenStatus};

/// Points per vibe shared by candidate and profile
pub const VIBE_MATCH_POINTS: f64 = 3.0;

/// Walk time above which a pick is flagged as far
pub const FAR_WALK_MINUTES: u32 = 25;

/// Per-factor contributions to a score
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub open: f64,
    pub vibe: f64,
    pub price: f64,
    pub distance: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.open + self.vibe + self.price + self.distance
    }
}

/// Result of scoring one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub value: f64,
    pub open_status: OpenStatus,
    pub breakdown: ScoreBreakdown,
    /// Miles from the profile start, `None` when unknown or no start is set
    pub distance_miles: Option<f64>,
    pub vibe_matches: usize,
}

/// Score a candidate against a profile at the given time of day
pub fn score(candidate: &Candidate, profile: &PreferenceProfile, at: NaiveTime) -> Score {
    let open_status = geo::open_status(&candidate.hours, at);

    let vibe_matches = vibe_matches(candidate, profile);

    let price = if candidate.price <= profile.price_cap {
        1.0
    } else {
        -((candidate.price - profile.price_cap) as f64)
    };

    let distance_miles = profile
        .start
        .as_ref()
        .and_then(|start| geo::haversine_miles(start.location(), candidate.location));

    let breakdown = ScoreBreakdown {
        open: open_status.weight(),
        vibe: vibe_matches as f64 * VIBE_MATCH_POINTS,
        price,
        distance: distance_points(distance_miles),
    };

    Score {
        value: breakdown.total(),
        open_status,
        breakdown,
        distance_miles,
        vibe_matches,
    }
}

/// Distinct candidate vibes that the profile also has
fn vibe_matches(candidate: &Candidate, profile: &PreferenceProfile) -> usize {
    let mut seen: Vec<&str> = Vec::with_capacity(candidate.vibes.len());
    for vibe in &candidate.vibes {
        if profile.has_vibe(vibe) && !seen.contains(&vibe.as_str()) {
            seen.push(vibe);
        }
    }
    seen.len()
}

/// Distance bands: <=0.4mi +2, <=0.8mi +1, >1.8mi -1, otherwise (or unknown) 0
pub fn distance_points(miles: Option<f64>) -> f64 {
    match miles {
        Some(d) if d <= 0.4 => 2.0,
        Some(d) if d <= 0.8 => 1.0,
        Some(d) if d > 1.8 => -1.0,
        _ => 0.0,
    }
}

/// Status shown to the user: the live flag wins when the provider sent one
pub fn display_status(candidate: &Candidate, at: NaiveTime) -> String {
    match candidate.open_now {
        Some(true) => "Open now".to_string(),
        Some(false) => "Closed now".to_string(),
        None => geo::open_status(&candidate.hours, at).label(),
    }
}

/// Short caveats shown under a pick ("why we picked it")
pub fn pick_reasons(candidate: &Candidate, score: &Score) -> Vec<String> {
    let mut reasons = Vec::new();
    if score.open_status != OpenStatus::Open {
        reasons.push(score.open_status.label());
    }
    if candidate.price >= crate::domain::MAX_PRICE {
        reasons.push("Higher cost".to_string());
    }
    if geo::minutes_walk(score.distance_miles).is_some_and(|m| m > FAR_WALK_MINUTES) {
        reasons.push("Far walk".to_string());
    }
    reasons
}
