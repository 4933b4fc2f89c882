pub mod cached;
pub mod direct;
pub mod news_api;
pub mod proxy;
pub mod xml;

pub use cached::CachedFetcher;
pub use direct::DirectFeedSource;
pub use news_api::NewsApiSource;
pub use proxy::ProxyFeedSource;
pub use xml::XmlFeedSource;

use crate::config::{Secrets, SourcesConfig};
use crate::fetcher::Fetcher;
use crate::traits::FeedFetcher;
use crate::types::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The interchangeable ways of turning an outlet's feed location into entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedBackend {
    #[default]
    Direct,
    Xml,
    Proxy,
    NewsApi,
}

impl FeedBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedBackend::Direct => "direct",
            FeedBackend::Xml => "xml",
            FeedBackend::Proxy => "proxy",
            FeedBackend::NewsApi => "newsapi",
        }
    }
}

impl fmt::Display for FeedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "feed" => Ok(FeedBackend::Direct),
            "xml" => Ok(FeedBackend::Xml),
            "proxy" | "rss2json" => Ok(FeedBackend::Proxy),
            "newsapi" | "news-api" => Ok(FeedBackend::NewsApi),
            other => Err(format!(
                "unknown backend '{}', expected one of: direct, xml, proxy, newsapi",
                other
            )),
        }
    }
}

/// Build the fetcher for a backend, wrapped in a TTL cache when `cache_ttl` is non-zero
pub fn build_fetcher(
    backend: FeedBackend,
    http: Arc<Fetcher>,
    config: &SourcesConfig,
    secrets: &Secrets,
    cache_ttl: Duration,
) -> Result<Arc<dyn FeedFetcher>> {
    let inner: Arc<dyn FeedFetcher> = match backend {
        FeedBackend::Direct => Arc::new(DirectFeedSource::new(http)),
        FeedBackend::Xml => Arc::new(XmlFeedSource::new(http)),
        FeedBackend::Proxy => Arc::new(ProxyFeedSource::new(
            http,
            &config.proxy_base_url,
            secrets.rss2json_api_key.clone(),
            config.max_items,
        )?),
        FeedBackend::NewsApi => Arc::new(NewsApiSource::new(
            http,
            &config.news_api_base_url,
            secrets.news_api_key.clone(),
            config.max_items,
        )?),
    };

    info!("Using {} feed backend", backend);

    if cache_ttl.is_zero() {
        Ok(inner)
    } else {
        Ok(Arc::new(CachedFetcher::new(inner, cache_ttl)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("direct".parse::<FeedBackend>().unwrap(), FeedBackend::Direct);
        assert_eq!("RSS2JSON".parse::<FeedBackend>().unwrap(), FeedBackend::Proxy);
        assert_eq!("news-api".parse::<FeedBackend>().unwrap(), FeedBackend::NewsApi);
        assert!("carrier-pigeon".parse::<FeedBackend>().is_err());
    }

    #[test]
    fn test_newsapi_requires_key() {
        let http = Arc::new(Fetcher::new(Default::default()).unwrap());
        let secrets = Secrets::default();
        let result = build_fetcher(
            FeedBackend::NewsApi,
            http,
            &SourcesConfig::default(),
            &secrets,
            Duration::ZERO,
        );
        assert!(result.is_err());
    }
}
