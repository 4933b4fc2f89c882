use super::FeedBackend;
use crate::fetcher::Fetcher;
use crate::traits::FeedFetcher;
use crate::types::{NewsError, OutletDescriptor, RawEntry, Result};
use crate::utils::text::extract_text_from_html;
use crate::utils::time::parse_feed_date;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use url::Url;

pub const DEFAULT_PROXY_BASE_URL: &str = "https://api.rss2json.com";

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    items: Vec<ProxyItem>,
}

#[derive(Debug, Deserialize)]
struct ProxyItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub_date: Option<String>,
}

/// Feed-to-JSON proxy in the rss2json format: the proxy fetches and parses the
/// feed, we only decode its JSON
pub struct ProxyFeedSource {
    fetcher: Arc<Fetcher>,
    endpoint: Url,
    api_key: Option<String>,
    max_items: usize,
}

impl ProxyFeedSource {
    pub fn new(fetcher: Arc<Fetcher>, base_url: &str, api_key: Option<String>, max_items: usize) -> Result<Self> {
        let endpoint = Url::parse(base_url)?.join("v1/api.json")?;
        Ok(Self {
            fetcher,
            endpoint,
            api_key,
            max_items,
        })
    }

    fn request_url(&self, feed_url: &str) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("rss_url", feed_url);
            // The proxy only honours `count` for keyed requests
            if let Some(key) = &self.api_key {
                query.append_pair("api_key", key);
                query.append_pair("count", &self.max_items.to_string());
            }
        }
        url
    }
}

#[async_trait]
impl FeedFetcher for ProxyFeedSource {
    fn backend(&self) -> FeedBackend {
        FeedBackend::Proxy
    }

    async fn fetch(&self, outlet: &OutletDescriptor) -> Result<Vec<RawEntry>> {
        let url = self.request_url(&outlet.feed_url);
        let response: ProxyResponse = self.fetcher.fetch_json(url.as_str(), HeaderMap::new()).await?;

        if response.status != "ok" {
            return Err(NewsError::Api {
                service: "rss2json".to_string(),
                message: response
                    .message
                    .unwrap_or_else(|| format!("status '{}'", response.status)),
            });
        }

        let entries: Vec<RawEntry> = response
            .items
            .into_iter()
            .map(|item| RawEntry {
                title: item.title,
                summary: item
                    .description
                    .map(|d| extract_text_from_html(&d))
                    .filter(|d| !d.is_empty()),
                link: item.link.filter(|l| !l.trim().is_empty()),
                published: item.pub_date.as_deref().and_then(parse_feed_date),
            })
            .collect();

        info!("Pulled {} entries from {} via proxy", entries.len(), outlet.name);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FetchConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Arc<Fetcher> {
        let config = FetchConfig {
            max_retries: 0,
            min_host_interval_ms: 0,
            ..FetchConfig::default()
        };
        Arc::new(Fetcher::new(config).unwrap())
    }

    fn outlet() -> OutletDescriptor {
        OutletDescriptor::new("NPR", "https://feeds.npr.org/1001/rss.xml", "Center-Left", "High")
    }

    #[tokio::test]
    async fn test_proxy_items_are_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/api.json"))
            .and(query_param("rss_url", "https://feeds.npr.org/1001/rss.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "feed": { "title": "NPR Topics: News" },
                "items": [
                    {
                        "title": "Senate passes budget",
                        "link": "https://www.npr.org/budget",
                        "description": "<p>The vote was close</p>",
                        "pubDate": "2025-10-14 09:30:00"
                    },
                    { "title": "No description", "link": "https://www.npr.org/other" }
                ]
            })))
            .mount(&server)
            .await;

        let source = ProxyFeedSource::new(fetcher(), &server.uri(), None, 10).unwrap();
        let entries = source.fetch(&outlet()).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Senate passes budget");
        assert_eq!(entries[0].summary.as_deref(), Some("The vote was close"));
        assert!(entries[0].published.is_some());
        assert!(entries[1].summary.is_none());
    }

    #[tokio::test]
    async fn test_proxy_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/api.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "message": "Cannot download this RSS feed",
                "items": []
            })))
            .mount(&server)
            .await;

        let source = ProxyFeedSource::new(fetcher(), &server.uri(), None, 10).unwrap();
        let err = source.fetch(&outlet()).await.unwrap_err();
        match err {
            NewsError::Api { service, message } => {
                assert_eq!(service, "rss2json");
                assert!(message.contains("Cannot download"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_request_url_includes_key_and_count() {
        let source = ProxyFeedSource::new(fetcher(), DEFAULT_PROXY_BASE_URL, Some("k".to_string()), 5).unwrap();
        let url = source.request_url("https://example.com/feed?a=1");
        assert!(url.as_str().starts_with("https://api.rss2json.com/v1/api.json?rss_url="));
        assert!(url.as_str().contains("rss_url=https%3A%2F%2Fexample.com%2Ffeed%3Fa%3D1"));
        assert!(url.as_str().contains("api_key=k"));
        assert!(url.as_str().contains("count=5"));
    }
}
