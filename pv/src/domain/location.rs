//! Coordinates and start points

use serde::{Deserialize, Serialize};

/// A point in floating-point degrees
///
/// Not validated: non-finite values are carried through and show up as
/// "distance unknown" downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Link that opens this point in a maps app
    pub fn maps_url(&self) -> String {
        format!("https://www.google.com/maps?q={},{}", self.lat, self.lng)
    }
}

/// Named origin of a plan (a preset, a geocoded place, or the device position)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartPoint {
    pub label: String,
    pub lat: f64,
    pub lng: f64,
}

impl StartPoint {
    pub fn new(label: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            label: label.into(),
            lat,
            lng,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lng)
    }
}

/// Built-in start presets; the first one is the default start
pub fn start_presets() -> Vec<StartPoint> {
    vec![
        StartPoint::new("Boston Common", 42.355, -71.065),
        StartPoint::new("Back Bay", 42.35, -71.081),
        StartPoint::new("Seaport", 42.351, -71.043),
        StartPoint::new("Cambridgeport", 42.356, -71.11),
    ]
}

/// Look up a preset by label, case-insensitively
pub fn find_preset(label: &str) -> Option<StartPoint> {
    start_presets()
        .into_iter()
        .find(|p| p.label.eq_ignore_ascii_case(label.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preset_is_boston_common() {
        let first = &start_presets()[0];
        assert_eq!(first.label, "Boston Common");
        assert_eq!(first.location(), Location::new(42.355, -71.065));
    }

    #[test]
    fn test_find_preset() {
        assert_eq!(find_preset("back bay").unwrap().label, "Back Bay");
        assert!(find_preset("Nowhere").is_none());
    }

    #[test]
    fn test_non_finite() {
        assert!(!Location::new(f64::NAN, 0.0).is_finite());
        assert!(Location::new(1.0, 2.0).is_finite());
    }
}
