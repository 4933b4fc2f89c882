use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn unrated() -> String {
    "Unrated".to_string()
}

/// A news outlet as listed in the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutletDescriptor {
    pub name: String,
    #[serde(alias = "rss", alias = "url")]
    pub feed_url: String,
    #[serde(default = "unrated")]
    pub bias: String,
    #[serde(default = "unrated")]
    pub reliability: String,
}

impl OutletDescriptor {
    pub fn new(name: &str, feed_url: &str, bias: &str, reliability: &str) -> Self {
        Self {
            name: name.to_string(),
            feed_url: feed_url.to_string(),
            bias: bias.to_string(),
            reliability: reliability.to_string(),
        }
    }
}

/// A feed entry as returned by a fetcher backend, before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: String,
    pub summary: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

/// A normalized article ready for filtering, clustering and rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub outlet: String,
    pub bias: String,
    pub reliability: String,
    pub title: String,
    pub summary: Option<String>,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Text used for keyword matching and vectorization
    pub fn text(&self) -> String {
        match &self.summary {
            Some(summary) => format!("{} {}", self.title, summary),
            None => self.title.clone(),
        }
    }
}

/// A group of articles judged to cover the same topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleCluster {
    pub id: usize,
    pub label: String,
    pub terms: Vec<String>,
    pub headline: String,
    pub articles: Vec<Article>,
}

impl ArticleCluster {
    pub fn size(&self) -> usize {
        self.articles.len()
    }

    /// Number of distinct outlets reporting on this topic
    pub fn outlet_count(&self) -> usize {
        let mut outlets: Vec<&str> = self.articles.iter().map(|a| a.outlet.as_str()).collect();
        outlets.sort_unstable();
        outlets.dedup();
        outlets.len()
    }
}

/// Articles fetched for one outlet, or the reason the fetch failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutletSection {
    pub outlet: OutletDescriptor,
    pub articles: Vec<Article>,
    pub error: Option<String>,
}

/// Everything a renderer needs to display one refresh of the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub refresh: u64,
    pub generated_at: DateTime<Utc>,
    pub keyword: Option<String>,
    pub sections: Vec<OutletSection>,
    pub clusters: Vec<ArticleCluster>,
    pub total_articles: usize,
}

impl DashboardSnapshot {
    pub fn articles(&self) -> impl Iterator<Item = &Article> {
        self.sections.iter().flat_map(|s| s.articles.iter())
    }

    pub fn failed_outlets(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| s.error.is_some())
            .map(|s| s.outlet.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
    pub min_host_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "News-Dashboard/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_ms: 500,
            max_feed_size_mb: 10,
            max_redirects: 5,
            min_host_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub url: String,
    pub status: u16,
    pub content: String,
    pub response_time_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// `body` keeps the response text so callers can read error payloads
    #[error("HTTP {status} from {url}")]
    Status {
        status: u16,
        url: String,
        body: Option<String>,
    },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error from {service}: {message}")]
    Api { service: String, message: String },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, NewsError>;
