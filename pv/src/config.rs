//! Pivot configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main Pivot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when no `--log-level` flag is given
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Candidate search provider
    pub search: SearchConfig,

    /// Geocoding for custom start points
    pub geocode: GeocodeConfig,

    /// Cache directory and durable record store
    pub storage: StorageConfig,

    /// Share link settings
    pub share: ShareConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .pivot.yml
        let local_config = PathBuf::from(".pivot.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/pivot/pivot.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pivot").join("pivot.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Which candidate search backs build and pivot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProvider {
    /// Built-in offline venue list
    Catalog,
    /// Places text search over HTTP
    Places,
}

impl std::fmt::Display for SearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalog => write!(f, "catalog"),
            Self::Places => write!(f, "places"),
        }
    }
}

impl std::str::FromStr for SearchProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "catalog" => Ok(Self::Catalog),
            "places" => Ok(Self::Places),
            _ => Err(format!("Unknown search provider: '{}'. Supported: catalog, places", s)),
        }
    }
}

/// Candidate search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// `catalog` or `places`
    pub provider: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Search radius around the start point
    #[serde(rename = "radius-m")]
    pub radius_m: u32,

    /// Only return venues the provider reports open
    #[serde(rename = "open-now")]
    pub open_now: bool,

    /// Text query sent to the provider
    pub query: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "catalog".to_string(),
            base_url: "https://maps.googleapis.com".to_string(),
            api_key_env: "GOOGLE_MAPS_API_KEY".to_string(),
            radius_m: 1800,
            open_now: true,
            query: "coffee OR dessert OR gallery OR park OR bar".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Search configuration with the provider parsed and the key looked up
#[derive(Clone)]
pub struct ResolvedSearchConfig {
    pub provider: SearchProvider,
    pub base_url: String,
    pub api_key: Option<String>,
    pub radius_m: u32,
    pub open_now: bool,
    pub query: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ResolvedSearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSearchConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("radius_m", &self.radius_m)
            .field("open_now", &self.open_now)
            .field("query", &self.query)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SearchConfig {
    /// Resolve against the process environment
    pub fn resolve(&self) -> Result<ResolvedSearchConfig> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<ResolvedSearchConfig> {
        let provider: SearchProvider = self.provider.parse().map_err(|e: String| eyre::eyre!(e))?;
        Ok(ResolvedSearchConfig {
            provider,
            base_url: self.base_url.clone(),
            api_key: env(&self.api_key_env).filter(|k| !k.is_empty()),
            radius_m: self.radius_m,
            open_now: self.open_now,
            query: self.query.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
        })
    }
}

/// Geocoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com".to_string(),
            api_key_env: "GOOGLE_MAPS_API_KEY".to_string(),
            timeout_ms: 5_000,
        }
    }
}

#[derive(Clone)]
pub struct ResolvedGeocodeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl GeocodeConfig {
    pub fn resolve(&self) -> ResolvedGeocodeConfig {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> ResolvedGeocodeConfig {
        ResolvedGeocodeConfig {
            base_url: self.base_url.clone(),
            api_key: env(&self.api_key_env).filter(|k| !k.is_empty()),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Device cache directory (default: platform data dir)
    #[serde(rename = "cache-dir")]
    pub cache_dir: Option<PathBuf>,

    /// Base URL of the KV REST API; no durable store when unset
    #[serde(rename = "kv-url")]
    pub kv_url: Option<String>,

    /// Environment variable containing the KV bearer token
    #[serde(rename = "kv-token-env")]
    pub kv_token_env: String,

    /// Quiet window before a durable write is sent
    #[serde(rename = "debounce-ms")]
    pub debounce_ms: u64,

    /// Durable store request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            kv_url: None,
            kv_token_env: "KV_REST_API_TOKEN".to_string(),
            debounce_ms: 600,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Clone)]
pub struct ResolvedStorageConfig {
    pub cache_dir: PathBuf,
    pub kv_url: Option<String>,
    pub kv_token: Option<String>,
    pub debounce: Duration,
    pub timeout: Duration,
}

impl StorageConfig {
    pub fn resolve(&self) -> Result<ResolvedStorageConfig> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<ResolvedStorageConfig> {
        let cache_dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .ok_or_else(|| eyre::eyre!("Could not determine local data directory"))?
                .join(pivotstore::DEFAULT_CACHE_DIR_NAME)
                .join("cache"),
        };
        Ok(ResolvedStorageConfig {
            cache_dir,
            kv_url: self.kv_url.clone().filter(|u| !u.trim().is_empty()),
            kv_token: env(&self.kv_token_env).filter(|t| !t.is_empty()),
            debounce: Duration::from_millis(self.debounce_ms),
            timeout: Duration::from_millis(self.timeout_ms),
        })
    }
}

/// Share link configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Origin prepended to share paths, e.g. `https://pivot.example`
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.search.provider, "catalog");
        assert_eq!(config.search.radius_m, 1800);
        assert!(config.search.open_now);
        assert_eq!(config.storage.debounce_ms, 600);
        assert!(config.storage.kv_url.is_none());
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug

search:
  provider: places
  api-key-env: MY_PLACES_KEY
  radius-m: 2500
  open-now: false
  timeout-ms: 3000

storage:
  cache-dir: /tmp/pivot-cache
  kv-url: https://kv.example.com
  debounce-ms: 250

share:
  base-url: https://pivot.example
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.search.provider, "places");
        assert_eq!(config.search.api_key_env, "MY_PLACES_KEY");
        assert_eq!(config.search.radius_m, 2500);
        assert!(!config.search.open_now);
        assert_eq!(config.storage.cache_dir, Some(PathBuf::from("/tmp/pivot-cache")));
        assert_eq!(config.storage.debounce_ms, 250);
        assert_eq!(config.share.base_url.as_deref(), Some("https://pivot.example"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
search:
  query: tacos
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.search.query, "tacos");
        assert_eq!(config.search.provider, "catalog");
        assert_eq!(config.geocode.api_key_env, "GOOGLE_MAPS_API_KEY");
        assert_eq!(config.storage.kv_token_env, "KV_REST_API_TOKEN");
    }

    #[test]
    fn test_resolve_reads_only_the_named_env() {
        let config = SearchConfig {
            provider: "places".to_string(),
            ..SearchConfig::default()
        };
        let resolved = config
            .resolve_with(|name| (name == "GOOGLE_MAPS_API_KEY").then(|| "secret".to_string()))
            .unwrap();
        assert_eq!(resolved.provider, SearchProvider::Places);
        assert_eq!(resolved.api_key.as_deref(), Some("secret"));
        assert!(!format!("{:?}", resolved).contains("secret"));
    }

    #[test]
    fn test_resolve_rejects_unknown_provider() {
        let config = SearchConfig {
            provider: "carrier-pigeon".to_string(),
            ..SearchConfig::default()
        };
        assert!(config.resolve_with(|_| None).is_err());
    }

    #[test]
    fn test_storage_resolve() {
        let config = StorageConfig {
            cache_dir: Some(PathBuf::from("/tmp/c")),
            kv_url: Some("  ".to_string()),
            ..StorageConfig::default()
        };
        let resolved = config.resolve_with(|_| Some("tok".to_string())).unwrap();
        assert_eq!(resolved.cache_dir, PathBuf::from("/tmp/c"));
        assert!(resolved.kv_url.is_none());
        assert_eq!(resolved.kv_token.as_deref(), Some("tok"));
        assert_eq!(resolved.debounce, Duration::from_millis(600));
    }
}
