use anyhow::{Context, Result};
use clap::Parser;
use news_dashboard::utils::time::format_duration;
use news_dashboard::{
    build_fetcher, logging, ClusterSettings, DashboardConfig, DashboardPipeline, FeedBackend, Fetcher, Language,
    OutletRegistry, OutputFormat, PassThroughTranslator, PipelineSettings, Renderer, TranslationStage,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Fetch world news from a registry of outlets, group related stories and
/// render them as a dashboard.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Configuration file (defaults to config/default.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Outlet registry JSON file (defaults to the bundled registry)
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Feed backend: direct, xml, proxy or newsapi
    #[arg(short, long)]
    backend: Option<FeedBackend>,

    /// Only show this outlet (repeatable)
    #[arg(short, long = "outlet")]
    outlets: Vec<String>,

    /// Only keep articles mentioning this keyword
    #[arg(short, long)]
    keyword: Option<String>,

    /// Articles per outlet, 0 for all
    #[arg(short, long)]
    limit: Option<usize>,

    /// Group related articles into topic clusters
    #[arg(long, overrides_with = "no_cluster")]
    cluster: bool,

    /// Skip topic clustering
    #[arg(long)]
    no_cluster: bool,

    /// Maximum cosine distance between related articles
    #[arg(long)]
    eps: Option<f64>,

    /// Neighbors an article needs to seed a cluster
    #[arg(long)]
    min_samples: Option<usize>,

    /// Smallest cluster that is shown
    #[arg(long)]
    min_cluster_size: Option<usize>,

    /// Display language: en, de, fr, es or zh
    #[arg(long)]
    language: Option<Language>,

    /// Output format: markdown, plain or json
    #[arg(short, long, default_value = "markdown")]
    format: OutputFormat,

    /// Always fetch fresh feeds
    #[arg(long)]
    no_cache: bool,

    /// Keep refreshing until interrupted
    #[arg(short, long)]
    watch: bool,

    /// Seconds between refreshes in watch mode
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Write the dashboard to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Cli {
    /// Command line values take precedence over the config file
    fn apply(&self, config: &mut DashboardConfig) {
        if let Some(registry) = &self.registry {
            config.sources.registry_path = Some(registry.clone());
        }
        if let Some(backend) = self.backend {
            config.sources.backend = backend;
        }
        if !self.outlets.is_empty() {
            config.pipeline.outlets = self.outlets.clone();
        }
        if let Some(keyword) = &self.keyword {
            config.pipeline.keyword = Some(keyword.clone());
        }
        if let Some(limit) = self.limit {
            config.pipeline.entries_per_outlet = limit;
        }
        if self.no_cluster {
            config.pipeline.clustering_enabled = false;
        } else if self.cluster {
            config.pipeline.clustering_enabled = true;
        }

        let ClusterSettings {
            eps,
            min_samples,
            min_cluster_size,
            ..
        } = &mut config.clustering;
        if let Some(value) = self.eps {
            *eps = value;
        }
        if let Some(value) = self.min_samples {
            *min_samples = value;
        }
        if let Some(value) = self.min_cluster_size {
            *min_cluster_size = value;
        }

        if let Some(language) = self.language {
            config.pipeline.language = Some(language);
        }
        if self.no_cache {
            config.cache.ttl_seconds = 0;
        }
        if let Some(interval) = self.interval_secs {
            config.pipeline.refresh_interval_seconds = interval;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let (mut config, secrets) =
        DashboardConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid settings")?;

    let registry = match &config.sources.registry_path {
        Some(path) => OutletRegistry::load(path)
            .with_context(|| format!("Failed to load registry {}", path.display()))?,
        None => OutletRegistry::builtin().context("Bundled registry is invalid")?,
    };
    info!("Loaded {} outlets", registry.len());

    let http = Arc::new(Fetcher::new(config.fetch.clone()).context("Failed to build HTTP client")?);
    let fetcher = build_fetcher(
        config.sources.backend,
        http,
        &config.sources,
        &secrets,
        config.cache.ttl(),
    )
    .context("Failed to set up feed backend")?;

    let mut builder = DashboardPipeline::builder(registry, fetcher).settings(PipelineSettings::from_config(&config));
    if let Some(language) = config.pipeline.language {
        builder = builder.add_processing_stage(Box::new(TranslationStage::new(
            Arc::new(PassThroughTranslator),
            language,
        )));
    }
    let pipeline = builder.build().context("Failed to build pipeline")?;
    let renderer = Renderer::new(cli.format);

    if cli.watch {
        let interval = Duration::from_secs(config.pipeline.refresh_interval_seconds);
        watch(&pipeline, &renderer, cli.output.as_deref(), interval).await
    } else {
        refresh_once(&pipeline, &renderer, cli.output.as_deref()).await
    }
}

async fn refresh_once(pipeline: &DashboardPipeline, renderer: &Renderer, output: Option<&Path>) -> Result<()> {
    let snapshot = pipeline.refresh().await.context("Refresh failed")?;
    let rendered = renderer.render(&snapshot).context("Failed to render dashboard")?;
    emit(&rendered, output).await
}

/// Refresh on a fixed interval until Ctrl-C
async fn watch(
    pipeline: &DashboardPipeline,
    renderer: &Renderer,
    output: Option<&Path>,
    interval: Duration,
) -> Result<()> {
    info!("Auto-refresh every {}, press Ctrl-C to stop", format_duration(interval));

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
        }
    };
    run_every(interval, || refresh_once(pipeline, renderer, output), shutdown).await;

    info!("Stopping after {} refreshes", pipeline.refresh_count());
    Ok(())
}

/// Run `cycle` every `interval` until `shutdown` completes. A failed cycle is
/// logged and the next one runs as scheduled. A cycle still running at
/// shutdown is dropped. Returns the number of cycles started.
async fn run_every<F, Fut, S>(interval: Duration, mut cycle: F, shutdown: S) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
    S: Future,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut cycles = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => return cycles,
        }

        cycles += 1;
        tokio::select! {
            result = cycle() => {
                if let Err(e) = result {
                    error!("Refresh cycle failed: {:#}", e);
                }
            }
            _ = &mut shutdown => {
                info!("Interrupted during refresh cycle {}", cycles);
                return cycles;
            }
        }
    }
}

async fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote dashboard to {}", path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(rendered.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
