//! Candidate venues

use serde::{Deserialize, Serialize};

use super::Location;

/// Stable candidate identifier (stable across refreshes from the same source)
pub type CandidateId = String;

/// Venue category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Coffee,
    #[default]
    Eat,
    Bar,
    Park,
    Gallery,
    Shop,
    Dessert,
}

impl Category {
    /// Infer a category from free-text name/type fields
    pub fn infer(text: &str) -> Self {
        let text = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| text.contains(w));

        if has(&["cafe", "café", "coffee", "espresso", "teahouse"]) {
            Self::Coffee
        } else if has(&["bar", "pub", "taproom", "club", "lounge", "brewery"]) {
            Self::Bar
        } else if has(&["gallery", "museum", "studio"]) {
            Self::Gallery
        } else if has(&["park", "garden", "courtyard", "walk"]) {
            Self::Park
        } else if has(&["bakery", "dessert", "gelato", "ice cream", "pies", "sweet"]) {
            Self::Dessert
        } else if has(&["shop", "store", "book", "vinyl", "record", "market"]) {
            Self::Shop
        } else {
            Self::Eat
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coffee => write!(f, "coffee"),
            Self::Eat => write!(f, "eat"),
            Self::Bar => write!(f, "bar"),
            Self::Park => write!(f, "park"),
            Self::Gallery => write!(f, "gallery"),
            Self::Shop => write!(f, "shop"),
            Self::Dessert => write!(f, "dessert"),
        }
    }
}

/// Ambient noise level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoiseLevel {
    Low,
    #[default]
    Med,
    High,
}

impl NoiseLevel {
    /// Guess a noise level from the inferred category and free text
    pub fn infer(category: Category, text: &str) -> Self {
        let text = text.to_lowercase();
        if category == Category::Bar || text.contains("club") {
            Self::High
        } else if matches!(category, Category::Park | Category::Gallery) || text.contains("library") {
            Self::Low
        } else {
            Self::Med
        }
    }
}

impl std::fmt::Display for NoiseLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Med => write!(f, "med"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Fixed daily schedule in fractional hours (`22.5` is 22:30)
///
/// `open >= close` means the interval spans midnight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hours {
    pub open: f64,
    pub close: f64,
}

impl Hours {
    pub fn new(open: f64, close: f64) -> Self {
        Self { open, close }
    }

    /// Open around the clock; also used when a provider reports no schedule
    ///
    /// The day still ends at 24:00, so these read as closing soon late at night.
    pub fn all_day() -> Self {
        Self::new(0.0, 24.0)
    }
}

impl Default for Hours {
    fn default() -> Self {
        Self::all_day()
    }
}

/// A venue eligible for inclusion in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    #[serde(default)]
    pub neighborhood: String,
    pub location: Location,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub vibes: Vec<String>,
    pub price: u8,
    #[serde(default)]
    pub hours: Hours,
    /// Live "open now" signal from the provider, display-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
    #[serde(default)]
    pub noise: NoiseLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dietary: Vec<String>,
}

impl Candidate {
    /// Minimal candidate; remaining fields take their defaults
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            neighborhood: String::new(),
            location,
            category: Category::default(),
            vibes: Vec::new(),
            price: 2,
            hours: Hours::default(),
            open_now: None,
            noise: NoiseLevel::default(),
            dietary: Vec::new(),
        }
    }

    pub fn with_vibes(mut self, vibes: &[&str]) -> Self {
        self.vibes = vibes.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_price(mut self, price: u8) -> Self {
        self.price = price;
        self
    }

    pub fn with_hours(mut self, open: f64, close: f64) -> Self {
        self.hours = Hours::new(open, close);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_neighborhood(mut self, neighborhood: impl Into<String>) -> Self {
        self.neighborhood = neighborhood.into();
        self
    }

    pub fn with_noise(mut self, noise: NoiseLevel) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_open_now(mut self, open_now: Option<bool>) -> Self {
        self.open_now = open_now;
        self
    }

    /// `$`, `$$` or `$$$`
    pub fn price_symbol(&self) -> String {
        "$".repeat(self.price as usize)
    }
}
