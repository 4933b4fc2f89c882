use crate::clustering::{cluster_articles, ClusterSettings};
use crate::config::DashboardConfig;
use crate::normalize::{deduplicate_articles, normalize_entries};
use crate::processing::{KeywordFilterStage, ProcessingInput, ProcessingStage};
use crate::registry::OutletRegistry;
use crate::traits::FeedFetcher;
use crate::types::{Article, DashboardSnapshot, NewsError, OutletDescriptor, OutletSection, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What one refresh fetches and how it is post-processed
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Outlet names to include; empty includes every registered outlet
    pub outlets: Vec<String>,
    /// Articles kept per outlet, 0 for no limit
    pub entries_per_outlet: usize,
    pub concurrency: usize,
    pub keyword: Option<String>,
    /// `None` disables clustering
    pub clustering: Option<ClusterSettings>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            outlets: Vec::new(),
            entries_per_outlet: 3,
            concurrency: 4,
            keyword: None,
            clustering: Some(ClusterSettings::default()),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            outlets: config.pipeline.outlets.clone(),
            entries_per_outlet: config.pipeline.entries_per_outlet,
            concurrency: config.pipeline.concurrency,
            keyword: config.pipeline.keyword.clone(),
            clustering: config.pipeline.clustering_enabled.then(|| config.clustering.clone()),
        }
    }

    /// Keyword with surrounding whitespace removed, if any is left
    fn effective_keyword(&self) -> Option<&str> {
        self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Fetch → normalize → process → cluster, producing one snapshot per refresh
pub struct DashboardPipeline {
    registry: OutletRegistry,
    fetcher: Arc<dyn FeedFetcher>,
    processing_stages: Vec<Box<dyn ProcessingStage>>,
    settings: PipelineSettings,
    refresh_count: AtomicU64,
}

impl DashboardPipeline {
    pub fn builder(registry: OutletRegistry, fetcher: Arc<dyn FeedFetcher>) -> PipelineBuilder {
        PipelineBuilder::new(registry, fetcher)
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &OutletRegistry {
        &self.registry
    }

    /// Number of refreshes completed so far
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    /// Run one full refresh of the dashboard.
    ///
    /// A failing outlet does not fail the refresh; its section carries the error.
    pub async fn refresh(&self) -> Result<DashboardSnapshot> {
        let started = Instant::now();
        let outlets = self.registry.select(&self.settings.outlets);
        info!(
            "Refreshing {} outlets via {} backend",
            outlets.len(),
            self.fetcher.backend()
        );

        let mut sections = self.fetch_sections(outlets).await;

        let mut seen_links = HashSet::new();
        for section in &mut sections {
            deduplicate_articles(&mut section.articles, &mut seen_links);
        }

        self.run_stages(&mut sections).await?;

        let articles: Vec<Article> = sections.iter().flat_map(|s| s.articles.iter().cloned()).collect();
        let clusters = match &self.settings.clustering {
            Some(settings) => cluster_articles(&articles, settings)?,
            None => Vec::new(),
        };

        let refresh = self.refresh_count.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = DashboardSnapshot {
            refresh,
            generated_at: Utc::now(),
            keyword: self.settings.effective_keyword().map(str::to_string),
            total_articles: articles.len(),
            sections,
            clusters,
        };

        let failed = snapshot.failed_outlets();
        if !failed.is_empty() {
            warn!("{} outlets failed: {}", failed.len(), failed.join(", "));
        }
        info!(
            "Refresh #{} finished in {}ms: {} articles, {} clusters",
            refresh,
            started.elapsed().as_millis(),
            snapshot.total_articles,
            snapshot.clusters.len()
        );

        Ok(snapshot)
    }

    /// Fetch and normalize every outlet, keeping registry order
    async fn fetch_sections(&self, outlets: Vec<OutletDescriptor>) -> Vec<OutletSection> {
        let limit = self.settings.entries_per_outlet;

        stream::iter(outlets)
            .map(|outlet| {
                let fetcher = Arc::clone(&self.fetcher);
                async move {
                    match fetcher.fetch(&outlet).await {
                        Ok(entries) => {
                            let articles = normalize_entries(&outlet, entries, limit);
                            debug!("{} returned {} articles", outlet.name, articles.len());
                            OutletSection {
                                outlet,
                                articles,
                                error: None,
                            }
                        }
                        Err(e) => {
                            warn!("Could not load {}: {}", outlet.name, e);
                            OutletSection {
                                outlet,
                                articles: Vec::new(),
                                error: Some(e.to_string()),
                            }
                        }
                    }
                }
            })
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await
    }

    /// Run the processing stages over all articles, then put the survivors
    /// back into their outlet sections
    async fn run_stages(&self, sections: &mut [OutletSection]) -> Result<()> {
        if self.processing_stages.is_empty() {
            return Ok(());
        }

        let mut input = ProcessingInput {
            articles: sections.iter().flat_map(|s| s.articles.iter().cloned()).collect(),
            metadata: HashMap::new(),
        };

        for stage in &self.processing_stages {
            let before = input.articles.len();
            let output = stage.process(input).await?;
            debug!(
                "Stage {} kept {} of {} articles",
                stage.stage_name(),
                output.articles.len(),
                before
            );
            input = output.into();
        }

        let mut processed: HashMap<Uuid, Article> = input.articles.into_iter().map(|a| (a.id, a)).collect();
        for section in sections.iter_mut() {
            section.articles = section
                .articles
                .iter()
                .filter_map(|a| processed.remove(&a.id))
                .collect();
        }

        Ok(())
    }
}

/// Pipeline builder for easier configuration
pub struct PipelineBuilder {
    registry: OutletRegistry,
    fetcher: Arc<dyn FeedFetcher>,
    processing_stages: Vec<Box<dyn ProcessingStage>>,
    settings: PipelineSettings,
}

impl PipelineBuilder {
    pub fn new(registry: OutletRegistry, fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            registry,
            fetcher,
            processing_stages: Vec::new(),
            settings: PipelineSettings::default(),
        }
    }

    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn add_processing_stage(mut self, stage: Box<dyn ProcessingStage>) -> Self {
        info!("Adding processing stage to pipeline: {}", stage.stage_name());
        self.processing_stages.push(stage);
        self
    }

    /// Validate settings and assemble the pipeline. A configured keyword
    /// becomes the first processing stage.
    pub fn build(self) -> Result<DashboardPipeline> {
        if self.settings.concurrency == 0 {
            return Err(NewsError::InvalidParameter {
                name: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(clustering) = &self.settings.clustering {
            clustering.validate()?;
        }

        let mut processing_stages = self.processing_stages;
        if let Some(keyword) = self.settings.effective_keyword() {
            processing_stages.insert(0, Box::new(KeywordFilterStage::new(keyword)));
        }

        Ok(DashboardPipeline {
            registry: self.registry,
            fetcher: self.fetcher,
            processing_stages,
            settings: self.settings,
            refresh_count: AtomicU64::new(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::TranslationStage;
    use crate::sources::FeedBackend;
    use crate::translate::{Language, Translator};
    use crate::types::RawEntry;
    use async_trait::async_trait;

    struct StubFetcher {
        entries: HashMap<String, Vec<RawEntry>>,
    }

    fn entry(title: &str, link: &str) -> RawEntry {
        RawEntry {
            title: title.to_string(),
            summary: Some(format!("{} in depth", title)),
            link: Some(link.to_string()),
            published: None,
        }
    }

    #[async_trait]
    impl FeedFetcher for StubFetcher {
        fn backend(&self) -> FeedBackend {
            FeedBackend::Direct
        }

        async fn fetch(&self, outlet: &OutletDescriptor) -> Result<Vec<RawEntry>> {
            self.entries
                .get(&outlet.name)
                .cloned()
                .ok_or_else(|| NewsError::Status {
                    status: 503,
                    url: outlet.feed_url.clone(),
                    body: None,
                })
        }
    }

    fn registry() -> OutletRegistry {
        OutletRegistry::new(vec![
            OutletDescriptor::new("Alpha", "https://alpha.example.com/rss", "Left", "High"),
            OutletDescriptor::new("Beta", "https://beta.example.com/rss", "Right", "Medium"),
            OutletDescriptor::new("Gamma", "https://gamma.example.com/rss", "Center", "High"),
            OutletDescriptor::new("Down", "https://down.example.com/rss", "Center", "Low"),
        ])
        .unwrap()
    }

    fn fetcher() -> Arc<dyn FeedFetcher> {
        let mut entries = HashMap::new();
        entries.insert(
            "Alpha".to_string(),
            vec![
                entry("Earthquake strikes Japan coast", "https://alpha.example.com/quake"),
                entry("Central bank raises interest rates", "https://alpha.example.com/rates"),
                entry("Local bakery wins award", "https://alpha.example.com/bakery"),
                entry("Fourth story beyond the limit", "https://alpha.example.com/fourth"),
            ],
        );
        entries.insert(
            "Beta".to_string(),
            vec![
                entry("Japan coast earthquake strikes", "https://beta.example.com/quake"),
                // Syndicated copy of an Alpha story
                entry("Central bank raises interest rates", "https://alpha.example.com/rates"),
            ],
        );
        entries.insert(
            "Gamma".to_string(),
            vec![entry("Earthquake strikes the Japan coast", "https://gamma.example.com/quake")],
        );
        Arc::new(StubFetcher { entries })
    }

    #[tokio::test]
    async fn test_refresh_builds_sections_in_registry_order() {
        let pipeline = DashboardPipeline::builder(registry(), fetcher()).build().unwrap();
        let snapshot = pipeline.refresh().await.unwrap();

        let names: Vec<_> = snapshot.sections.iter().map(|s| s.outlet.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma", "Down"]);

        assert_eq!(snapshot.sections[0].articles.len(), 3, "limited to three per outlet");
        assert_eq!(snapshot.sections[1].articles.len(), 1, "duplicate link removed");
        assert_eq!(snapshot.sections[3].articles.len(), 0);
        assert!(snapshot.sections[3].error.as_deref().unwrap().contains("503"));
        assert_eq!(snapshot.failed_outlets(), vec!["Down"]);
        assert_eq!(snapshot.total_articles, 5);
        assert_eq!(snapshot.refresh, 1);
    }

    #[tokio::test]
    async fn test_refresh_clusters_related_stories() {
        let pipeline = DashboardPipeline::builder(registry(), fetcher()).build().unwrap();
        let snapshot = pipeline.refresh().await.unwrap();

        assert_eq!(snapshot.clusters.len(), 1);
        let cluster = &snapshot.clusters[0];
        assert_eq!(cluster.size(), 3);
        assert_eq!(cluster.outlet_count(), 3);
        assert!(cluster.terms.iter().any(|t| t == "earthquake" || t == "japan" || t == "coast"));
    }

    #[tokio::test]
    async fn test_keyword_and_selection() {
        let settings = PipelineSettings {
            outlets: vec!["beta".to_string(), "gamma".to_string()],
            keyword: Some(" EARTHQUAKE ".to_string()),
            clustering: None,
            ..PipelineSettings::default()
        };
        let pipeline = DashboardPipeline::builder(registry(), fetcher())
            .settings(settings)
            .build()
            .unwrap();
        let snapshot = pipeline.refresh().await.unwrap();

        assert_eq!(snapshot.keyword.as_deref(), Some("EARTHQUAKE"));
        assert_eq!(snapshot.sections.len(), 2);
        assert_eq!(snapshot.total_articles, 2);
        assert!(snapshot
            .articles()
            .all(|a| a.title.to_lowercase().contains("earthquake")));
        assert!(snapshot.clusters.is_empty());
    }

    #[tokio::test]
    async fn test_unlimited_entries_and_refresh_counter() {
        let settings = PipelineSettings {
            outlets: vec!["Alpha".to_string()],
            entries_per_outlet: 0,
            ..PipelineSettings::default()
        };
        let pipeline = DashboardPipeline::builder(registry(), fetcher())
            .settings(settings)
            .build()
            .unwrap();

        let first = pipeline.refresh().await.unwrap();
        let second = pipeline.refresh().await.unwrap();
        assert_eq!(first.sections[0].articles.len(), 4);
        assert_eq!(second.refresh, 2);
        assert_eq!(pipeline.refresh_count(), 2);
    }

    struct BracketTranslator;

    #[async_trait]
    impl Translator for BracketTranslator {
        fn name(&self) -> &str {
            "bracket"
        }

        async fn translate(&self, text: &str, target: Language) -> Result<String> {
            Ok(format!("[{}] {}", target, text))
        }
    }

    #[tokio::test]
    async fn test_stages_rewrite_articles_in_place() {
        let settings = PipelineSettings {
            outlets: vec!["Gamma".to_string()],
            clustering: None,
            ..PipelineSettings::default()
        };
        let pipeline = DashboardPipeline::builder(registry(), fetcher())
            .settings(settings)
            .add_processing_stage(Box::new(TranslationStage::new(Arc::new(BracketTranslator), Language::Fr)))
            .build()
            .unwrap();

        let snapshot = pipeline.refresh().await.unwrap();
        assert_eq!(snapshot.sections[0].articles[0].title, "[FR] Earthquake strikes the Japan coast");
    }

    #[test]
    fn test_invalid_settings_fail_to_build() {
        let settings = PipelineSettings {
            concurrency: 0,
            ..PipelineSettings::default()
        };
        assert!(DashboardPipeline::builder(registry(), fetcher())
            .settings(settings)
            .build()
            .is_err());

        let settings = PipelineSettings {
            clustering: Some(ClusterSettings {
                eps: 0.0,
                ..ClusterSettings::default()
            }),
            ..PipelineSettings::default()
        };
        assert!(DashboardPipeline::builder(registry(), fetcher())
            .settings(settings)
            .build()
            .is_err());
    }
}
