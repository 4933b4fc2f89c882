use crate::types::{Article, OutletDescriptor, RawEntry};
use crate::utils::text::extract_text_from_html;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

const UNTITLED: &str = "Untitled";

/// Turn an outlet's raw entries into articles.
///
/// Entries without a link are dropped, then at most `limit` articles are kept
/// in feed order (`0` keeps everything).
pub fn normalize_entries(outlet: &OutletDescriptor, entries: Vec<RawEntry>, limit: usize) -> Vec<Article> {
    let total = entries.len();
    let articles: Vec<Article> = entries
        .into_iter()
        .filter_map(|entry| normalize_entry(outlet, entry))
        .take(if limit == 0 { usize::MAX } else { limit })
        .collect();

    debug!("Normalized {} of {} entries from {}", articles.len(), total, outlet.name);
    articles
}

fn normalize_entry(outlet: &OutletDescriptor, entry: RawEntry) -> Option<Article> {
    let link = match entry.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()) {
        Some(link) => link,
        None => {
            debug!("Skipping entry without link from {}: {}", outlet.name, entry.title);
            return None;
        }
    };

    let title = extract_text_from_html(&entry.title);
    let title = if title.is_empty() { UNTITLED.to_string() } else { title };

    let summary = entry
        .summary
        .map(|s| extract_text_from_html(&s))
        .filter(|s| !s.is_empty());

    Some(Article {
        id: article_id(&link),
        outlet: outlet.name.clone(),
        bias: outlet.bias.clone(),
        reliability: outlet.reliability.clone(),
        title,
        summary,
        link,
        published_at: entry.published,
    })
}

/// Stable id derived from the article link, so refreshes agree on identity
pub fn article_id(link: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, link.as_bytes())
}

/// Remove articles whose link was already seen; the first occurrence wins
pub fn deduplicate_articles(articles: &mut Vec<Article>, seen_links: &mut HashSet<String>) {
    let before = articles.len();
    articles.retain(|a| seen_links.insert(a.link.clone()));

    let removed_count = before - articles.len();
    if removed_count > 0 {
        info!("Removed {} duplicate articles", removed_count);
    }
}
