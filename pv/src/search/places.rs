//! Places text search over HTTP

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{CandidateSearch, SearchError, SearchQuery, normalize};
use crate::config::ResolvedSearchConfig;
use crate::domain::Candidate;

/// Path of the text search endpoint under the provider base URL
const TEXT_SEARCH_PATH: &str = "/maps/api/place/textsearch/json";

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Text search client for a Places-style HTTP API
pub struct PlacesSearch {
    api_key: String,
    base_url: String,
    http: Client,
}

impl PlacesSearch {
    /// Create a client from resolved configuration; requires an API key
    pub fn from_config(config: &ResolvedSearchConfig) -> Result<Self, SearchError> {
        debug!(base_url = %config.base_url, "from_config: called");
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| SearchError::NotConfigured("no places API key; set the configured api-key-env".to_string()))?;
        let http = Client::builder().timeout(config.timeout).build().map_err(SearchError::Network)?;
        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl CandidateSearch for PlacesSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Candidate>, SearchError> {
        debug!(terms = %query.terms, radius_m = query.radius_m, "PlacesSearch::search: called");
        let url = format!("{}{}", self.base_url, TEXT_SEARCH_PATH);
        let location = format!("{},{}", query.location.lat, query.location.lng);
        let radius = query.radius_m.to_string();
        let mut params = vec![
            ("query", query.terms.as_str()),
            ("location", location.as_str()),
            ("radius", radius.as_str()),
            ("key", self.api_key.as_str()),
        ];
        if query.open_now_only {
            params.push(("opennow", "true"));
        }

        let response = self.http.get(&url).query(&params).send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            debug!(%status, "PlacesSearch::search: http error");
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError { status, message });
        }

        let body: TextSearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        match body.status.as_str() {
            "OK" => Ok(normalize::normalize_all(&body.results)),
            "ZERO_RESULTS" => {
                debug!("PlacesSearch::search: zero results");
                Ok(Vec::new())
            }
            other => {
                debug!(status = %other, "PlacesSearch::search: provider status");
                Err(SearchError::ApiError {
                    status,
                    message: match body.error_message {
                        Some(msg) => format!("{}: {}", other, msg),
                        None => format!("Places status: {}", other),
                    },
                })
            }
        }
    }
}
