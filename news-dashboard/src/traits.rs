use crate::sources::FeedBackend;
use crate::types::{OutletDescriptor, RawEntry, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for pulling raw entries for an outlet from some feed backend
/// (direct feed parsing, a feed-to-JSON proxy, a news API, ...)
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Which backend this fetcher talks to
    fn backend(&self) -> FeedBackend;

    /// Fetch the current entries for an outlet, in feed order
    async fn fetch(&self, outlet: &OutletDescriptor) -> Result<Vec<RawEntry>>;
}

#[async_trait]
impl<F: FeedFetcher + ?Sized> FeedFetcher for Arc<F> {
    fn backend(&self) -> FeedBackend {
        (**self).backend()
    }

    async fn fetch(&self, outlet: &OutletDescriptor) -> Result<Vec<RawEntry>> {
        (**self).fetch(outlet).await
    }
}
