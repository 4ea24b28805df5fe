//! Geocoding and place autocomplete
//!
//! Used to turn typed text into a start point. Lookups never fail outward:
//! [`LocationLookup`] degrades every error to an empty list plus a notice.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::ResolvedGeocodeConfig;
use crate::controller::Notice;
use crate::domain::{Location, StartPoint};

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Geocoder error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Geocoder not configured: {0}")]
    NotConfigured(String),
}

/// A resolved place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPlace {
    pub id: String,
    pub label: String,
    pub location: Location,
}

impl GeoPlace {
    pub fn to_start(&self) -> StartPoint {
        StartPoint::new(self.label.clone(), self.location.lat, self.location.lng)
    }
}

/// An autocomplete suggestion; resolve its id to get coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub description: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, text: &str) -> Result<Vec<GeoPlace>, GeocodeError>;

    async fn autocomplete(&self, text: &str) -> Result<Vec<Suggestion>, GeocodeError>;

    async fn resolve(&self, id: &str) -> Result<Option<GeoPlace>, GeocodeError>;
}

/// Geocoder used when no API key is configured
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn geocode(&self, _text: &str) -> Result<Vec<GeoPlace>, GeocodeError> {
        Err(GeocodeError::NotConfigured("no geocoding API key".to_string()))
    }

    async fn autocomplete(&self, _text: &str) -> Result<Vec<Suggestion>, GeocodeError> {
        Err(GeocodeError::NotConfigured("no geocoding API key".to_string()))
    }

    async fn resolve(&self, _id: &str) -> Result<Option<GeoPlace>, GeocodeError> {
        Err(GeocodeError::NotConfigured("no geocoding API key".to_string()))
    }
}

/// Result of a lookup after fallbacks
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<T> {
    pub items: Vec<T>,
    pub notice: Option<Notice>,
}

impl<T> Lookup<T> {
    fn ok(items: Vec<T>) -> Self {
        Self { items, notice: None }
    }

    fn failed(err: GeocodeError) -> Self {
        debug!(error = %err, "lookup failed; falling back to empty list");
        Self {
            items: Vec::new(),
            notice: Some(Notice::GeocodeFailed(err.to_string())),
        }
    }
}

/// Failure-tolerant front for a [`Geocoder`]
#[derive(Clone)]
pub struct LocationLookup {
    geocoder: Arc<dyn Geocoder>,
}

impl LocationLookup {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    pub async fn geocode(&self, text: &str) -> Lookup<GeoPlace> {
        debug!(%text, "LocationLookup::geocode: called");
        if text.trim().is_empty() {
            return Lookup::ok(Vec::new());
        }
        match self.geocoder.geocode(text.trim()).await {
            Ok(items) => Lookup::ok(items),
            Err(e) => Lookup::failed(e),
        }
    }

    pub async fn autocomplete(&self, text: &str) -> Lookup<Suggestion> {
        debug!(%text, "LocationLookup::autocomplete: called");
        if text.trim().is_empty() {
            return Lookup::ok(Vec::new());
        }
        match self.geocoder.autocomplete(text.trim()).await {
            Ok(items) => Lookup::ok(items),
            Err(e) => Lookup::failed(e),
        }
    }

    pub async fn resolve(&self, id: &str) -> Lookup<GeoPlace> {
        debug!(%id, "LocationLookup::resolve: called");
        match self.geocoder.resolve(id).await {
            Ok(place) => Lookup::ok(place.into_iter().collect()),
            Err(e) => Lookup::failed(e),
        }
    }
}

/// Geocoder over a Maps-style HTTP API
pub struct HttpGeocoder {
    api_key: String,
    base_url: String,
    http: Client,
}

impl HttpGeocoder {
    pub fn from_config(config: &ResolvedGeocodeConfig) -> Result<Self, GeocodeError> {
        debug!(base_url = %config.base_url, "from_config: called");
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| GeocodeError::NotConfigured("no geocoding API key".to_string()))?;
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, GeocodeError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeocodeError::ApiError { status, message });
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;
        match body.get("status").and_then(Value::as_str) {
            Some("OK") | Some("ZERO_RESULTS") => Ok(body),
            Some(other) => Err(GeocodeError::ApiError {
                status,
                message: other.to_string(),
            }),
            None => Err(GeocodeError::InvalidResponse("missing status".to_string())),
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn geocode(&self, text: &str) -> Result<Vec<GeoPlace>, GeocodeError> {
        debug!(%text, "HttpGeocoder::geocode: called");
        let body = self.get("/maps/api/geocode/json", &[("address", text)]).await?;
        Ok(array(&body, "results").iter().filter_map(parse_place).collect())
    }

    async fn autocomplete(&self, text: &str) -> Result<Vec<Suggestion>, GeocodeError> {
        debug!(%text, "HttpGeocoder::autocomplete: called");
        let body = self.get("/maps/api/place/autocomplete/json", &[("input", text)]).await?;
        Ok(array(&body, "predictions").iter().filter_map(parse_suggestion).collect())
    }

    async fn resolve(&self, id: &str) -> Result<Option<GeoPlace>, GeocodeError> {
        debug!(%id, "HttpGeocoder::resolve: called");
        let body = self
            .get(
                "/maps/api/place/details/json",
                &[("place_id", id), ("fields", "place_id,name,formatted_address,geometry")],
            )
            .await?;
        Ok(body.get("result").and_then(parse_place))
    }
}

fn array<'a>(body: &'a Value, field: &str) -> &'a [Value] {
    body.get(field).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn parse_place(raw: &Value) -> Option<GeoPlace> {
    let loc = raw.pointer("/geometry/location")?;
    let lat = loc.get("lat").and_then(Value::as_f64)?;
    let lng = loc.get("lng").and_then(Value::as_f64)?;
    let label = raw
        .get("formatted_address")
        .or_else(|| raw.get("name"))
        .and_then(Value::as_str)?
        .to_string();
    let id = raw.get("place_id").and_then(Value::as_str).unwrap_or(&label).to_string();
    Some(GeoPlace {
        id,
        label,
        location: Location::new(lat, lng),
    })
}

fn parse_suggestion(raw: &Value) -> Option<Suggestion> {
    Some(Suggestion {
        id: raw.get("place_id").and_then(Value::as_str)?.to_string(),
        description: raw.get("description").and_then(Value::as_str)?.to_string(),
    })
}
