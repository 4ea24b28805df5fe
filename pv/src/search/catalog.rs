//! Built-in offline catalog
//!
//! A small fictional set of Boston venues so the engine works without a
//! provider key.

use async_trait::async_trait;
use chrono::NaiveTime;
use tracing::debug;

use super::{CandidateSearch, SearchError, SearchQuery};
use crate::domain::{Candidate, Category, Location, NoiseLevel};
use crate::geo;

/// Offline [`CandidateSearch`] over a fixed venue list
///
/// Query terms are ignored; the radius and `open_now_only` filters apply.
pub struct CatalogSearch {
    places: Vec<Candidate>,
    clock: fn() -> NaiveTime,
}

impl CatalogSearch {
    pub fn new() -> Self {
        Self::with_places(builtin_places())
    }

    pub fn with_places(places: Vec<Candidate>) -> Self {
        Self {
            places,
            clock: || chrono::Local::now().time(),
        }
    }

    /// Evaluate `open_now_only` against a fixed clock
    pub fn with_clock(mut self, clock: fn() -> NaiveTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn places(&self) -> &[Candidate] {
        &self.places
    }
}

impl Default for CatalogSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandidateSearch for CatalogSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Candidate>, SearchError> {
        debug!(terms = %query.terms, radius_m = query.radius_m, open_now_only = query.open_now_only, "CatalogSearch::search: called");
        let at = (self.clock)();
        let radius_miles = query.radius_m as f64 / 1609.344;
        let results: Vec<Candidate> = self
            .places
            .iter()
            .filter(|c| {
                // Unknown distance stays in; scoring treats it as neutral
                geo::haversine_miles(query.location, c.location).is_none_or(|d| d <= radius_miles)
            })
            .filter(|c| !query.open_now_only || geo::is_within(&c.hours, at))
            .cloned()
            .collect();
        debug!(count = results.len(), "CatalogSearch::search: done");
        Ok(results)
    }
}

struct Row {
    id: &'static str,
    name: &'static str,
    neighborhood: &'static str,
    lat: f64,
    lng: f64,
    category: Category,
    vibes: &'static [&'static str],
    price: u8,
    open: f64,
    close: f64,
    noise: NoiseLevel,
    dietary: &'static [&'static str],
}

#[rustfmt::skip]
const ROWS: [Row; 18] = [
    Row { id: "p1", name: "Elm Street Café", neighborhood: "Back Bay", lat: 42.3496, lng: -71.079, category: Category::Coffee, vibes: &["cozy"], price: 1, open: 7.0, close: 20.0, noise: NoiseLevel::Low, dietary: &["veg"] },
    Row { id: "p2", name: "Harbor Noodles", neighborhood: "Seaport", lat: 42.3508, lng: -71.041, category: Category::Eat, vibes: &["buzzy"], price: 2, open: 11.0, close: 22.5, noise: NoiseLevel::Med, dietary: &[] },
    Row { id: "p3", name: "Brick Gallery", neighborhood: "SoWa", lat: 42.341, lng: -71.065, category: Category::Gallery, vibes: &["artsy", "low-stim"], price: 1, open: 10.0, close: 18.0, noise: NoiseLevel::Low, dietary: &[] },
    Row { id: "p4", name: "Riverside Walk", neighborhood: "Cambridgeport", lat: 42.357, lng: -71.114, category: Category::Park, vibes: &["low-stim", "cozy"], price: 1, open: 0.0, close: 24.0, noise: NoiseLevel::Low, dietary: &[] },
    Row { id: "p5", name: "Beacon Pies", neighborhood: "Beacon Hill", lat: 42.3576, lng: -71.07, category: Category::Dessert, vibes: &["cozy"], price: 2, open: 12.0, close: 23.0, noise: NoiseLevel::Med, dietary: &["veg"] },
    Row { id: "p6", name: "Loft Bar", neighborhood: "Back Bay", lat: 42.3486, lng: -71.082, category: Category::Bar, vibes: &["buzzy"], price: 3, open: 16.0, close: 1.0, noise: NoiseLevel::High, dietary: &[] },
    Row { id: "p7", name: "Canal Espresso", neighborhood: "West End", lat: 42.366, lng: -71.062, category: Category::Coffee, vibes: &["artsy", "cozy"], price: 2, open: 7.0, close: 18.5, noise: NoiseLevel::Low, dietary: &[] },
    Row { id: "p8", name: "Garden Dumplings", neighborhood: "Chinatown", lat: 42.351, lng: -71.062, category: Category::Eat, vibes: &["buzzy"], price: 2, open: 11.0, close: 23.0, noise: NoiseLevel::Med, dietary: &[] },
    Row { id: "p9", name: "Quiet Pages Bookshop", neighborhood: "Back Bay", lat: 42.3502, lng: -71.079, category: Category::Shop, vibes: &["low-stim", "cozy"], price: 1, open: 10.0, close: 20.0, noise: NoiseLevel::Low, dietary: &[] },
    Row { id: "p10", name: "Seaport Gelato", neighborhood: "Seaport", lat: 42.352, lng: -71.041, category: Category::Dessert, vibes: &["buzzy"], price: 2, open: 12.0, close: 22.0, noise: NoiseLevel::Med, dietary: &[] },
    Row { id: "p11", name: "Indigo Studio", neighborhood: "South End", lat: 42.342, lng: -71.071, category: Category::Gallery, vibes: &["artsy"], price: 1, open: 11.0, close: 19.0, noise: NoiseLevel::Low, dietary: &[] },
    Row { id: "p12", name: "Green Courtyard", neighborhood: "MIT", lat: 42.359, lng: -71.093, category: Category::Park, vibes: &["low-stim"], price: 1, open: 0.0, close: 24.0, noise: NoiseLevel::Low, dietary: &[] },
    Row { id: "p13", name: "North End Slice", neighborhood: "North End", lat: 42.365, lng: -71.055, category: Category::Eat, vibes: &["cozy"], price: 1, open: 11.0, close: 24.0, noise: NoiseLevel::Med, dietary: &[] },
    Row { id: "p14", name: "Vinyl & Vibes", neighborhood: "Allston", lat: 42.353, lng: -71.132, category: Category::Shop, vibes: &["artsy", "buzzy"], price: 1, open: 12.0, close: 20.0, noise: NoiseLevel::Med, dietary: &[] },
    Row { id: "p15", name: "Lantern Bar", neighborhood: "Seaport", lat: 42.3515, lng: -71.044, category: Category::Bar, vibes: &["buzzy"], price: 3, open: 17.0, close: 1.0, noise: NoiseLevel::High, dietary: &[] },
    Row { id: "p16", name: "River Bean", neighborhood: "Cambridgeport", lat: 42.358, lng: -71.107, category: Category::Coffee, vibes: &["cozy"], price: 1, open: 7.0, close: 18.0, noise: NoiseLevel::Low, dietary: &[] },
    Row { id: "p17", name: "Soft Lights Lounge", neighborhood: "South End", lat: 42.34, lng: -71.072, category: Category::Bar, vibes: &["cozy", "low-stim"], price: 2, open: 17.0, close: 0.5, noise: NoiseLevel::Med, dietary: &[] },
    Row { id: "p18", name: "Harbor Sketch Museum", neighborhood: "Seaport", lat: 42.35, lng: -71.039, category: Category::Gallery, vibes: &["artsy", "low-stim"], price: 2, open: 10.0, close: 20.0, noise: NoiseLevel::Low, dietary: &[] },
];

/// The fixed venue list
pub fn builtin_places() -> Vec<Candidate> {
    ROWS.iter()
        .map(|r| {
            let mut c = Candidate::new(r.id, r.name, Location::new(r.lat, r.lng))
                .with_neighborhood(r.neighborhood)
                .with_category(r.category)
                .with_vibes(r.vibes)
                .with_price(r.price)
                .with_hours(r.open, r.close)
                .with_noise(r.noise);
            c.dietary = r.dietary.iter().map(|d| d.to_string()).collect();
            c
        })
        .collect()
}
