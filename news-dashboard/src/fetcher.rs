use crate::types::{FetchConfig, FetchedBody, NewsError, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Shared HTTP transport for every feed backend
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    rate_limiter: Arc<Mutex<HashMap<String, Instant>>>,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            config,
            rate_limiter: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// GET a document, retrying transient failures with exponential backoff
    pub async fn fetch_text(&self, url: &str) -> Result<FetchedBody> {
        self.fetch_text_with_headers(url, HeaderMap::new()).await
    }

    pub async fn fetch_text_with_headers(&self, url: &str, headers: HeaderMap) -> Result<FetchedBody> {
        let parsed = Url::parse(url)?;
        let start_time = Instant::now();

        let mut backoff = retry_backoff(&self.config);
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            self.apply_rate_limit(&parsed).await;

            match self.try_fetch(url, headers.clone()).await {
                Ok((status, content)) => {
                    let response_time_ms = start_time.elapsed().as_millis() as u64;
                    info!("Fetched {} ({} bytes in {}ms)", url, content.len(), response_time_ms);
                    return Ok(FetchedBody {
                        url: url.to_string(),
                        status,
                        content,
                        response_time_ms,
                    });
                }
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!("Attempt {} failed for {}: {}, retrying in {:?}", attempt + 1, url, e, delay);
                            tokio::time::sleep(delay).await;
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        warn!("Giving up on {} after {} attempts", url, self.config.max_retries + 1);
        Err(last_error.unwrap_or_else(|| NewsError::General(format!("No attempt made for {}", url))))
    }

    /// GET a JSON document and decode it. An error response whose body also
    /// decodes as `T` is returned as a value, for APIs that describe failures in
    /// JSON alongside a 4xx status.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str, headers: HeaderMap) -> Result<T> {
        match self.fetch_text_with_headers(url, headers).await {
            Ok(body) => Ok(serde_json::from_str(&body.content)?),
            Err(NewsError::Status {
                status,
                url,
                body: Some(body),
            }) => match serde_json::from_str(&body) {
                Ok(decoded) => {
                    debug!("Decoded HTTP {} error body from {}", status, url);
                    Ok(decoded)
                }
                Err(_) => Err(NewsError::Status {
                    status,
                    url,
                    body: Some(body),
                }),
            },
            Err(e) => Err(e),
        }
    }

    async fn try_fetch(&self, url: &str, headers: HeaderMap) -> Result<(u16, String)> {
        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();
        let limit_bytes = self.config.max_feed_size_mb.saturating_mul(1024 * 1024);

        if !status.is_success() {
            let body = match response.content_length() {
                Some(length) if length as usize > limit_bytes => None,
                _ => response.text().await.ok(),
            };
            return Err(NewsError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body: body.filter(|b| !b.is_empty() && b.len() <= limit_bytes),
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length as usize > limit_bytes {
                return Err(NewsError::FeedTooLarge {
                    size_mb: content_length as usize / (1024 * 1024),
                });
            }
        }

        let content = response.text().await?;
        if content.len() > limit_bytes {
            return Err(NewsError::FeedTooLarge {
                size_mb: content.len() / (1024 * 1024),
            });
        }

        Ok((status.as_u16(), content))
    }

    async fn apply_rate_limit(&self, url: &Url) {
        let min_interval = Duration::from_millis(self.config.min_host_interval_ms);
        if min_interval.is_zero() {
            return;
        }

        let host = url.host_str().unwrap_or("").to_string();

        // Reserve the next slot for this host, then sleep without holding the lock
        let wait = {
            let mut rate_limiter = self.rate_limiter.lock().await;
            let now = Instant::now();
            let next_slot = match rate_limiter.get(&host) {
                Some(last) if *last + min_interval > now => *last + min_interval,
                _ => now,
            };
            rate_limiter.insert(host.clone(), next_slot);
            next_slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            debug!("Rate limiting {}: waiting {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
    }
}

fn retry_backoff(config: &FetchConfig) -> ExponentialBackoff<backoff::SystemClock> {
    let delay = Duration::from_millis(config.retry_delay_ms);
    ExponentialBackoff {
        current_interval: delay,
        initial_interval: delay,
        max_interval: Duration::from_millis(config.retry_delay_ms.saturating_mul(32)),
        multiplier: 2.0,
        randomization_factor: 0.1,
        max_elapsed_time: None,
        ..Default::default()
    }
}

fn is_retryable(error: &NewsError) -> bool {
    match error {
        NewsError::Status { status, .. } => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            status.is_server_error()
                || status == StatusCode::TOO_MANY_REQUESTS
                || status == StatusCode::REQUEST_TIMEOUT
        }
        NewsError::Http(_) => true,
        _ => false,
    }
}
