//! Raw provider records to [`Candidate`]
//!
//! Providers return loosely shaped JSON. Everything is normalized here, at the
//! boundary; nothing downstream looks at raw records.

use serde_json::Value;
use tracing::debug;

use crate::domain::{Candidate, Category, DEFAULT_PRICE_CAP, DEFAULT_VIBE, Hours, Location, NoiseLevel, clamp_price};

/// Keyword rules for inferring vibes from names and type tags
const VIBE_RULES: [(&[&str], &str); 4] = [
    (&["gallery", "museum", "book", "vinyl"], "artsy"),
    (&["bar", "club", "taproom", "pub"], "buzzy"),
    (&["cafe", "coffee", "tea", "park", "garden"], "cozy"),
    (&["library", "museum", "park"], "low-stim"),
];

/// Vibes for free text; `["cozy"]` when nothing matches
pub fn infer_vibes(text: &str) -> Vec<String> {
    let text = text.to_lowercase();
    let vibes: Vec<String> = VIBE_RULES
        .iter()
        .filter(|(words, _)| words.iter().any(|w| text.contains(w)))
        .map(|(_, vibe)| vibe.to_string())
        .collect();
    if vibes.is_empty() {
        vec![DEFAULT_VIBE.to_string()]
    } else {
        vibes
    }
}

/// Normalize every record, dropping the ones without a usable id, name or location
pub fn normalize_all(raw: &[Value]) -> Vec<Candidate> {
    let candidates: Vec<Candidate> = raw.iter().filter_map(normalize).collect();
    debug!(raw = raw.len(), kept = candidates.len(), "normalize_all: done");
    candidates
}

/// Normalize one raw venue record
pub fn normalize(raw: &Value) -> Option<Candidate> {
    let name = str_field(raw, &["name"]).or_else(|| raw.pointer("/displayName/text").and_then(Value::as_str))?;
    let id = str_field(raw, &["id", "place_id", "placeId"]).unwrap_or(name);
    let location = location(raw)?;

    let types: Vec<&str> = raw
        .get("types")
        .and_then(Value::as_array)
        .map(|types| types.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let text = format!("{} {}", name, types.join(" ").replace('_', " "));

    let category = match str_field(raw, &["category"]).and_then(parse_category) {
        Some(category) => category,
        None => Category::infer(&text),
    };

    let vibes = match raw.get("vibes").and_then(Value::as_array) {
        Some(vibes) if !vibes.is_empty() => vibes.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => infer_vibes(&text),
    };

    let noise = match str_field(raw, &["noise"]) {
        Some("low") => NoiseLevel::Low,
        Some("med") => NoiseLevel::Med,
        Some("high") => NoiseLevel::High,
        _ => NoiseLevel::infer(category, &text),
    };

    let hours = match raw.get("hours") {
        Some(h) => match (h.get("open").and_then(Value::as_f64), h.get("close").and_then(Value::as_f64)) {
            (Some(open), Some(close)) => Hours::new(open, close),
            _ => Hours::all_day(),
        },
        None => Hours::all_day(),
    };

    let open_now = raw
        .pointer("/opening_hours/open_now")
        .or_else(|| raw.pointer("/currentOpeningHours/openNow"))
        .or_else(|| raw.get("openNow"))
        .and_then(Value::as_bool);

    let neighborhood = str_field(raw, &["neighborhood", "vicinity", "formatted_address", "formattedAddress"])
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .unwrap_or_default();

    let dietary = raw
        .get("dietary")
        .and_then(Value::as_array)
        .map(|d| d.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    Some(Candidate {
        id: id.to_string(),
        name: name.to_string(),
        neighborhood,
        location,
        category,
        vibes,
        price: price(raw),
        hours,
        open_now,
        noise,
        dietary,
    })
}

fn str_field<'a>(raw: &'a Value, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|n| raw.get(*n).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

fn location(raw: &Value) -> Option<Location> {
    let candidates = [
        raw.pointer("/geometry/location"),
        raw.get("location"),
        Some(raw),
    ];
    candidates.into_iter().flatten().find_map(|v| {
        let lat = v.get("lat").or_else(|| v.get("latitude")).and_then(Value::as_f64)?;
        let lng = v.get("lng").or_else(|| v.get("longitude")).and_then(Value::as_f64)?;
        Some(Location::new(lat, lng))
    })
}

fn parse_category(text: &str) -> Option<Category> {
    serde_json::from_value(Value::String(text.to_lowercase())).ok()
}

/// Price tier from `price`, `price_level` or a `PRICE_LEVEL_*` string; 2 by default
fn price(raw: &Value) -> u8 {
    let value = ["price", "price_level", "priceLevel"].iter().find_map(|n| raw.get(*n));
    match value {
        Some(Value::Number(n)) => n.as_f64().map(|p| clamp_price(p.round() as i64)).unwrap_or(DEFAULT_PRICE_CAP),
        Some(Value::String(s)) => match s.as_str() {
            "PRICE_LEVEL_FREE" | "PRICE_LEVEL_INEXPENSIVE" => 1,
            "PRICE_LEVEL_MODERATE" => 2,
            "PRICE_LEVEL_EXPENSIVE" | "PRICE_LEVEL_VERY_EXPENSIVE" => 3,
            _ => DEFAULT_PRICE_CAP,
        },
        _ => DEFAULT_PRICE_CAP,
    }
}
