//! Candidate search and geocoding providers
//!
//! Provides the provider traits, the built-in catalog, HTTP clients and the
//! normalization of raw venue records.

use std::sync::Arc;

use tracing::debug;

mod catalog;
pub mod client;
mod geocode;
pub mod normalize;
mod places;

pub use catalog::{CatalogSearch, builtin_places};
pub use client::{CandidateSearch, DEFAULT_RADIUS_M, SearchError, SearchQuery};
pub use geocode::{DisabledGeocoder, GeoPlace, GeocodeError, Geocoder, HttpGeocoder, LocationLookup, Lookup, Suggestion};
pub use places::PlacesSearch;

use crate::config::{ResolvedGeocodeConfig, ResolvedSearchConfig, SearchProvider};

/// Create a candidate search based on the configured provider
pub fn create_search(config: &ResolvedSearchConfig) -> Result<Arc<dyn CandidateSearch>, SearchError> {
    debug!(provider = %config.provider, "create_search: called");
    match config.provider {
        SearchProvider::Catalog => Ok(Arc::new(CatalogSearch::new())),
        SearchProvider::Places => Ok(Arc::new(PlacesSearch::from_config(config)?)),
    }
}

/// Create a geocoder; without an API key lookups degrade to empty results
pub fn create_geocoder(config: &ResolvedGeocodeConfig) -> Arc<dyn Geocoder> {
    match HttpGeocoder::from_config(config) {
        Ok(geocoder) => Arc::new(geocoder),
        Err(e) => {
            debug!(error = %e, "create_geocoder: using disabled geocoder");
            Arc::new(DisabledGeocoder)
        }
    }
}
