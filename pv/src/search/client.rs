//! CandidateSearch trait definition

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Candidate, Location};

/// Default search radius in meters
pub const DEFAULT_RADIUS_M: u32 = 1800;

/// Errors from candidate search providers
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Search not configured: {0}")]
    NotConfigured(String),
}

/// One search request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub terms: String,
    pub location: Location,
    pub radius_m: u32,
    pub open_now_only: bool,
}

impl SearchQuery {
    pub fn new(terms: impl Into<String>, location: Location) -> Self {
        Self {
            terms: terms.into(),
            location,
            radius_m: DEFAULT_RADIUS_M,
            open_now_only: true,
        }
    }

    pub fn with_radius(mut self, radius_m: u32) -> Self {
        self.radius_m = radius_m;
        self
    }

    pub fn with_open_now_only(mut self, open_now_only: bool) -> Self {
        self.open_now_only = open_now_only;
        self
    }
}

/// Venue search provider
///
/// Implementations normalize whatever the provider returns into
/// [`Candidate`] records before handing them back.
#[async_trait]
pub trait CandidateSearch: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Candidate>, SearchError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Scripted search for unit tests: each call pops the next response
    pub struct ScriptedSearch {
        responses: Mutex<Vec<Result<Vec<Candidate>, String>>>,
        call_count: AtomicUsize,
    }

    impl ScriptedSearch {
        pub fn new(responses: Vec<Result<Vec<Candidate>, String>>) -> Self {
            debug!(response_count = %responses.len(), "ScriptedSearch::new: called");
            Self {
                responses: Mutex::new(responses),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CandidateSearch for ScriptedSearch {
        async fn search(&self, _query: &SearchQuery) -> Result<Vec<Candidate>, SearchError> {
            debug!("ScriptedSearch::search: called");
            self.call_count.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(SearchError::InvalidResponse("No more scripted responses".to_string()));
            }
            responses.remove(0).map_err(SearchError::InvalidResponse)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_scripted_search_pops_in_order() {
            let search = ScriptedSearch::new(vec![
                Ok(vec![Candidate::new("a", "A", Location::new(0.0, 0.0))]),
                Err("down".to_string()),
            ]);
            let query = SearchQuery::new("coffee", Location::new(0.0, 0.0));

            assert_eq!(search.search(&query).await.unwrap().len(), 1);
            assert!(search.search(&query).await.is_err());
            assert!(search.search(&query).await.is_err());
            assert_eq!(search.call_count(), 3);
        }
    }
}
