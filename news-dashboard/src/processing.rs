use crate::translate::{Language, Translator};
use crate::types::{Article, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trait for processing pipeline stages
#[async_trait]
pub trait ProcessingStage: Send + Sync {
    /// Process input and produce output
    async fn process(&self, input: ProcessingInput) -> Result<ProcessingOutput>;

    /// Get the name of this processing stage
    fn stage_name(&self) -> String;
}

/// Input to a processing stage
#[derive(Debug, Clone, Default)]
pub struct ProcessingInput {
    pub articles: Vec<Article>,
    pub metadata: HashMap<String, String>,
}

/// Output from a processing stage
#[derive(Debug, Clone, Default)]
pub struct ProcessingOutput {
    pub articles: Vec<Article>,
    pub metadata: HashMap<String, String>,
}

impl From<ProcessingOutput> for ProcessingInput {
    fn from(output: ProcessingOutput) -> Self {
        Self {
            articles: output.articles,
            metadata: output.metadata,
        }
    }
}

/// Stage that keeps articles mentioning a search keyword
pub struct KeywordFilterStage {
    keyword: String,
}

impl KeywordFilterStage {
    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.trim().to_lowercase(),
        }
    }

    pub fn matches(&self, article: &Article) -> bool {
        self.keyword.is_empty() || article.text().to_lowercase().contains(&self.keyword)
    }
}

#[async_trait]
impl ProcessingStage for KeywordFilterStage {
    async fn process(&self, input: ProcessingInput) -> Result<ProcessingOutput> {
        debug!("Filtering {} articles for keyword '{}'", input.articles.len(), self.keyword);

        let before = input.articles.len();
        let articles: Vec<Article> = input.articles.into_iter().filter(|a| self.matches(a)).collect();

        let mut metadata = input.metadata;
        metadata.insert("stage".to_string(), "keyword_filter".to_string());
        metadata.insert("keyword".to_string(), self.keyword.clone());
        metadata.insert("items_filtered".to_string(), (before - articles.len()).to_string());

        Ok(ProcessingOutput { articles, metadata })
    }

    fn stage_name(&self) -> String {
        "keyword_filter".to_string()
    }
}

/// Stage that translates titles and summaries. A failed translation keeps the
/// original text.
pub struct TranslationStage {
    translator: Arc<dyn Translator>,
    target: Language,
}

impl TranslationStage {
    pub fn new(translator: Arc<dyn Translator>, target: Language) -> Self {
        Self { translator, target }
    }

    async fn translate_or_keep(&self, text: String) -> (String, bool) {
        match self.translator.translate(&text, self.target).await {
            Ok(translated) => (translated, true),
            Err(e) => {
                warn!("Translation to {} failed, keeping original: {}", self.target, e);
                (text, false)
            }
        }
    }
}

#[async_trait]
impl ProcessingStage for TranslationStage {
    async fn process(&self, input: ProcessingInput) -> Result<ProcessingOutput> {
        debug!(
            "Translating {} articles to {} with {}",
            input.articles.len(),
            self.target,
            self.translator.name()
        );

        let mut failures = 0;
        let mut articles = Vec::with_capacity(input.articles.len());

        for mut article in input.articles {
            let (title, ok) = self.translate_or_keep(article.title).await;
            article.title = title;
            failures += usize::from(!ok);

            if let Some(summary) = article.summary.take() {
                let (summary, ok) = self.translate_or_keep(summary).await;
                article.summary = Some(summary);
                failures += usize::from(!ok);
            }

            articles.push(article);
        }

        let mut metadata = input.metadata;
        metadata.insert("stage".to_string(), "translation".to_string());
        metadata.insert("language".to_string(), self.target.code().to_string());
        metadata.insert("translation_failures".to_string(), failures.to_string());

        Ok(ProcessingOutput { articles, metadata })
    }

    fn stage_name(&self) -> String {
        format!("translation_{}", self.target.code())
    }
}
