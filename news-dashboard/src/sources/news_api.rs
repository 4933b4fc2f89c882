use super::FeedBackend;
use crate::fetcher::Fetcher;
use crate::traits::FeedFetcher;
use crate::types::{NewsError, OutletDescriptor, RawEntry, Result};
use crate::utils::text::extract_text_from_html;
use crate::utils::time::parse_feed_date;
use crate::utils::url::extract_domain;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use url::Url;

pub const DEFAULT_NEWS_API_BASE_URL: &str = "https://newsapi.org";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

/// News aggregation API in the NewsAPI format; outlets are matched by the
/// domain of their feed URL
pub struct NewsApiSource {
    fetcher: Arc<Fetcher>,
    endpoint: Url,
    api_key: String,
    page_size: usize,
}

impl NewsApiSource {
    pub fn new(fetcher: Arc<Fetcher>, base_url: &str, api_key: Option<String>, page_size: usize) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| NewsError::Config("NEWSAPI_KEY must be set to use the newsapi backend".to_string()))?;

        Ok(Self {
            fetcher,
            endpoint: Url::parse(base_url)?.join("v2/everything")?,
            api_key,
            // The API caps pageSize at 100
            page_size: page_size.clamp(1, 100),
        })
    }

    fn request_url(&self, outlet: &OutletDescriptor) -> Result<Url> {
        let domain = extract_domain(&outlet.feed_url)
            .ok_or_else(|| NewsError::Registry(format!("{} has no usable feed domain", outlet.name)))?;

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("domains", &news_domain(&domain))
            .append_pair("pageSize", &self.page_size.to_string())
            .append_pair("sortBy", "publishedAt");
        Ok(url)
    }
}

/// Feed hosts are usually subdomains (feeds.bbci.co.uk, rss.cnn.com); the API
/// indexes the publication's main domain
fn news_domain(host: &str) -> String {
    let stripped = ["feeds.", "feed.", "rss.", "moxie."]
        .iter()
        .find_map(|prefix| host.strip_prefix(prefix))
        .unwrap_or(host);
    stripped.to_string()
}

#[async_trait]
impl FeedFetcher for NewsApiSource {
    fn backend(&self) -> FeedBackend {
        FeedBackend::NewsApi
    }

    async fn fetch(&self, outlet: &OutletDescriptor) -> Result<Vec<RawEntry>> {
        let url = self.request_url(outlet)?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| NewsError::Config(format!("Invalid NEWSAPI_KEY: {}", e)))?;
        headers.insert("X-Api-Key", key);

        let response: NewsApiResponse = self.fetcher.fetch_json(url.as_str(), headers).await?;

        if response.status != "ok" {
            let code = response.code.unwrap_or_else(|| "unknown".to_string());
            return Err(NewsError::Api {
                service: "newsapi".to_string(),
                message: format!("{}: {}", code, response.message.unwrap_or_default()),
            });
        }

        let entries: Vec<RawEntry> = response
            .articles
            .into_iter()
            .map(|article| RawEntry {
                title: article.title.unwrap_or_default(),
                summary: article
                    .description
                    .map(|d| extract_text_from_html(&d))
                    .filter(|d| !d.is_empty()),
                link: article.url,
                published: article.published_at.as_deref().and_then(parse_feed_date),
            })
            .collect();

        info!("Pulled {} articles for {} from the news API", entries.len(), outlet.name);
        Ok(entries)
    }
}
