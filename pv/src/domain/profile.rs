//! Preference profile

use serde::{Deserialize, Serialize};

use super::{StartPoint, start_presets};

/// Vibe vocabulary offered to the user
pub const VIBES: [&str; 4] = ["cozy", "buzzy", "artsy", "low-stim"];

/// Vibe selected for a fresh session
pub const DEFAULT_VIBE: &str = "cozy";

/// Price cap selected for a fresh session (mid-range)
pub const DEFAULT_PRICE_CAP: u8 = 2;

pub const MIN_PRICE: u8 = 1;
pub const MAX_PRICE: u8 = 3;

/// Clamp any integer into the 1..=3 price band
pub fn clamp_price(price: i64) -> u8 {
    price.clamp(MIN_PRICE as i64, MAX_PRICE as i64) as u8
}

/// The user's current mood/budget/location preferences
///
/// Vibes behave as a set (no duplicates) but keep insertion order for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceProfile {
    pub vibes: Vec<String>,
    pub price_cap: u8,
    pub start: Option<StartPoint>,
}

impl Default for PreferenceProfile {
    fn default() -> Self {
        Self {
            vibes: vec![DEFAULT_VIBE.to_string()],
            price_cap: DEFAULT_PRICE_CAP,
            start: start_presets().into_iter().next(),
        }
    }
}

impl PreferenceProfile {
    pub fn has_vibe(&self, vibe: &str) -> bool {
        self.vibes.iter().any(|v| v == vibe)
    }

    /// Add the vibe if absent, remove it if present; returns the new membership
    pub fn toggle_vibe(&mut self, vibe: &str) -> bool {
        if self.has_vibe(vibe) {
            self.vibes.retain(|v| v != vibe);
            false
        } else {
            self.vibes.push(vibe.to_string());
            true
        }
    }

    /// Replace the vibe set, dropping duplicates
    pub fn set_vibes<I, S>(&mut self, vibes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vibes.clear();
        for vibe in vibes {
            let vibe = vibe.into();
            if !self.has_vibe(&vibe) {
                self.vibes.push(vibe);
            }
        }
    }

    pub fn set_price_cap(&mut self, cap: i64) {
        self.price_cap = clamp_price(cap);
    }
}
