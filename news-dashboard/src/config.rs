use crate::clustering::ClusterSettings;
use crate::sources::news_api::DEFAULT_NEWS_API_BASE_URL;
use crate::sources::proxy::DEFAULT_PROXY_BASE_URL;
use crate::sources::FeedBackend;
use crate::translate::Language;
use crate::types::{FetchConfig, NewsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub fetch: FetchConfig,
    pub pipeline: PipelineConfig,
    pub clustering: ClusterSettings,
    pub cache: CacheConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Outlet names to show; empty shows the whole registry
    pub outlets: Vec<String>,
    pub entries_per_outlet: usize,
    /// Outlets fetched at the same time
    pub concurrency: usize,
    pub keyword: Option<String>,
    pub language: Option<Language>,
    pub clustering_enabled: bool,
    pub refresh_interval_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            outlets: Vec::new(),
            entries_per_outlet: 3,
            concurrency: 4,
            keyword: None,
            language: None,
            clustering_enabled: true,
            refresh_interval_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long fetched entries are reused; 0 disables caching
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 600 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub backend: FeedBackend,
    /// Registry file; the bundled registry is used when unset
    pub registry_path: Option<PathBuf>,
    pub proxy_base_url: String,
    pub news_api_base_url: String,
    /// Items requested per outlet from the proxy and news API backends
    pub max_items: usize,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            backend: FeedBackend::Direct,
            registry_path: None,
            proxy_base_url: DEFAULT_PROXY_BASE_URL.to_string(),
            news_api_base_url: DEFAULT_NEWS_API_BASE_URL.to_string(),
            max_items: 10,
        }
    }
}

/// Secrets loaded exclusively from environment variables.
/// Not serializable, not stored in config files.
#[derive(Clone, Default)]
pub struct Secrets {
    pub news_api_key: Option<String>,
    pub rss2json_api_key: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            news_api_key: non_empty_var("NEWSAPI_KEY"),
            rss2json_api_key: non_empty_var("RSS2JSON_API_KEY"),
        }
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("Secrets")
            .field("news_api_key", &mask(&self.news_api_key))
            .field("rss2json_api_key", &mask(&self.rss2json_api_key))
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl DashboardConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: DashboardConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration and secrets.
    ///
    /// An explicit path must exist. Without one, `config/default.toml` is read
    /// when present and built-in defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<(Self, Secrets)> {
        dotenvy::dotenv().ok();

        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };

        Ok((config, Secrets::from_env()))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NewsError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.concurrency == 0 {
            return Err(NewsError::InvalidParameter {
                name: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.pipeline.refresh_interval_seconds == 0 {
            return Err(NewsError::InvalidParameter {
                name: "refresh_interval_seconds",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.fetch.timeout_seconds == 0 {
            return Err(NewsError::InvalidParameter {
                name: "timeout_seconds",
                reason: "must be at least 1".to_string(),
            });
        }
        self.clustering.validate()
    }
}
