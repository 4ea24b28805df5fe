//! Domain types for Pivot
//!
//! Candidates, preference profiles, locations and event identities. These are
//! plain data; the behavior lives in `scoring`, `composer` and `controller`.

mod candidate;
mod identity;
mod location;
mod profile;

pub use candidate::{Candidate, CandidateId, Category, Hours, NoiseLevel};
pub use identity::{EventIdentity, MAX_SLUG_LEN, slugify};
pub use location::{Location, StartPoint, find_preset, start_presets};
pub use profile::{
    DEFAULT_PRICE_CAP, DEFAULT_VIBE, MAX_PRICE, MIN_PRICE, PreferenceProfile, VIBES, clamp_price,
};
