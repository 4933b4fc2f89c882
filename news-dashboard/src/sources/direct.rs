use super::FeedBackend;
use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::traits::FeedFetcher;
use crate::types::{NewsError, OutletDescriptor, RawEntry, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Fetches the outlet's feed document and parses it with feed-rs
pub struct DirectFeedSource {
    fetcher: Arc<Fetcher>,
}

impl DirectFeedSource {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl FeedFetcher for DirectFeedSource {
    fn backend(&self) -> FeedBackend {
        FeedBackend::Direct
    }

    async fn fetch(&self, outlet: &OutletDescriptor) -> Result<Vec<RawEntry>> {
        debug!("Pulling feed for {}: {}", outlet.name, outlet.feed_url);

        let body = self.fetcher.fetch_text(&outlet.feed_url).await?;
        debug!("{} answered HTTP {} in {}ms", body.url, body.status, body.response_time_ms);

        let parsed = FeedParser::parse_feed(&body.content).map_err(|e| {
            // Keep feed-rs's own error for XML feeds and JSON Feed
            if FeedParser::is_valid_feed_content(&body.content) || body.content.trim_start().starts_with('{') {
                e
            } else {
                NewsError::Parse(format!("{} did not return a feed document", body.url))
            }
        })?;

        info!(
            "Pulled {} entries from {} ({})",
            parsed.entries.len(),
            outlet.name,
            parsed.title.as_deref().unwrap_or("untitled feed")
        );
        Ok(parsed.entries)
    }
}
