use crate::types::{NewsError, RawEntry, Result};
use crate::utils::text::extract_text_from_html;
use feed_rs::parser;
use tracing::{debug, info};

#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<RawEntry>,
}

/// Feed document parser backed by feed-rs (RSS, Atom and JSON Feed)
pub struct FeedParser;

impl FeedParser {
    pub fn parse_feed(content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| NewsError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);

        let entries: Vec<RawEntry> = feed.entries.into_iter().map(Self::parse_entry).collect();

        info!("Parsed feed with {} entries", entries.len());

        Ok(ParsedFeed {
            title,
            entries,
        })
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> RawEntry {
        let title = entry.title.map(|t| t.content).unwrap_or_default();

        let link = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone());

        // Prefer the summary, fall back to the content body
        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .map(|s| extract_text_from_html(&s))
            .filter(|s| !s.is_empty());

        let published = entry.published.or(entry.updated);

        RawEntry {
            title,
            summary,
            link,
            published,
        }
    }

    /// Cheap check for whether a body looks like an RSS/Atom document
    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        let has_feed_indicators = content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<rdf:rdf")
            || content_lower.contains("<channel");

        has_feed_indicators && content.trim_start().starts_with('<')
    }
}
