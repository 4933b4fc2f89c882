pub mod clustering;
pub mod config;
pub mod fetcher;
pub mod logging;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod processing;
pub mod registry;
pub mod render;
pub mod sources;
pub mod traits;
pub mod translate;
pub mod types;
pub mod utils;

pub use clustering::{cluster_articles, ClusterSettings};
pub use config::{DashboardConfig, Secrets};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use pipeline::{DashboardPipeline, PipelineBuilder, PipelineSettings};
pub use processing::{KeywordFilterStage, ProcessingStage, TranslationStage};
pub use registry::OutletRegistry;
pub use render::{OutputFormat, Renderer};
pub use sources::{build_fetcher, FeedBackend};
pub use traits::FeedFetcher;
pub use translate::{Language, PassThroughTranslator, Translator};
pub use types::*;
