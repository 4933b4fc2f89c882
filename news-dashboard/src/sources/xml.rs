use super::FeedBackend;
use crate::fetcher::Fetcher;
use crate::traits::FeedFetcher;
use crate::types::{OutletDescriptor, RawEntry, Result};
use crate::utils::time::parse_feed_date;
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::sync::Arc;
use tracing::{debug, info};

/// Fetches the outlet's feed and walks the XML by hand, without a feed library
pub struct XmlFeedSource {
    fetcher: Arc<Fetcher>,
}

impl XmlFeedSource {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl FeedFetcher for XmlFeedSource {
    fn backend(&self) -> FeedBackend {
        FeedBackend::Xml
    }

    async fn fetch(&self, outlet: &OutletDescriptor) -> Result<Vec<RawEntry>> {
        let body = self.fetcher.fetch_text(&outlet.feed_url).await?;
        let entries = parse_xml_feed(&body.content)?;
        info!("Pulled {} entries from {} (xml)", entries.len(), outlet.name);
        Ok(entries)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Summary,
    Content,
    Published,
    Updated,
}

impl Field {
    /// Matches on the qualified name so extension elements such as
    /// `media:title` never land in the plain RSS/Atom fields
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" | b"summary" => Some(Field::Summary),
            b"content" | b"content:encoded" => Some(Field::Content),
            b"pubDate" | b"published" | b"dc:date" => Some(Field::Published),
            b"updated" => Some(Field::Updated),
            _ => None,
        }
    }
}

#[derive(Default)]
struct EntryBuilder {
    title: String,
    link: String,
    summary: String,
    content: String,
    published: String,
    updated: String,
    closed: Vec<Field>,
}

impl EntryBuilder {
    fn push(&mut self, field: Field, text: &str) {
        // A repeated element never extends a value that is already complete
        if self.closed.contains(&field) {
            return;
        }
        let target = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
        };
        target.push_str(text);
    }

    fn close(&mut self, field: Field) {
        let filled = match field {
            Field::Title => !self.title.trim().is_empty(),
            Field::Link => !self.link.trim().is_empty(),
            Field::Summary => !self.summary.trim().is_empty(),
            Field::Content => !self.content.trim().is_empty(),
            Field::Published => !self.published.trim().is_empty(),
            Field::Updated => !self.updated.trim().is_empty(),
        };
        if filled && !self.closed.contains(&field) {
            self.closed.push(field);
        }
    }

    /// Atom links carry the URL in `href`; only alternate (or unqualified) links count
    fn take_atom_link(&mut self, element: &BytesStart) -> Result<()> {
        if !self.link.is_empty() {
            return Ok(());
        }

        let mut href = None;
        let mut rel = None;
        for attr in element.attributes().flatten() {
            match attr.key.local_name().as_ref() {
                b"href" => href = Some(attr.unescape_value()?.into_owned()),
                b"rel" => rel = Some(attr.unescape_value()?.into_owned()),
                _ => {}
            }
        }

        if let Some(href) = href {
            if rel.as_deref().map_or(true, |r| r == "alternate") {
                self.link = href;
                self.close(Field::Link);
            }
        }
        Ok(())
    }

    fn build(self) -> RawEntry {
        let non_empty = |s: String| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        };

        let published = parse_feed_date(&self.published).or_else(|| parse_feed_date(&self.updated));
        let summary = non_empty(self.summary).or_else(|| non_empty(self.content));

        RawEntry {
            title: self.title.trim().to_string(),
            summary,
            link: non_empty(self.link),
            published,
        }
    }
}

fn is_entry(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

/// Parse RSS `<item>` and Atom `<entry>` elements into raw entries
pub fn parse_xml_feed(xml: &str) -> Result<Vec<RawEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                let name = name.as_ref();
                if is_entry(name) {
                    current = Some(EntryBuilder::default());
                    field = None;
                } else if let Some(entry) = current.as_mut() {
                    // Markup nested inside a field (e.g. xhtml content) stays part of that field
                    if field.is_none() {
                        field = Field::from_name(name);
                        if field == Some(Field::Link) {
                            entry.take_atom_link(&e)?;
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(entry) = current.as_mut() {
                    if field.is_none() && e.name().as_ref() == b"link" {
                        entry.take_atom_link(&e)?;
                    }
                }
            }
            Event::End(e) => {
                let name = e.name();
                let name = name.as_ref();
                if is_entry(name) {
                    if let Some(entry) = current.take() {
                        entries.push(entry.build());
                    }
                    field = None;
                } else if let Some(f) = field.filter(|f| Field::from_name(name) == Some(*f)) {
                    if let Some(entry) = current.as_mut() {
                        entry.close(f);
                    }
                    field = None;
                }
            }
            Event::Text(e) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    let text = e.unescape()?;
                    entry.push(f, &text);
                }
            }
            Event::CData(e) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    entry.push(f, &String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    debug!("Parsed {} entries from raw XML", entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewsError;

    #[test]
    fn test_parse_rss_items() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Channel title is ignored</title>
    <item>
      <title>Ceasefire talks resume</title>
      <link>https://example.com/a?x=1&amp;y=2</link>
      <description><![CDATA[<p>Negotiators meet again</p>]]></description>
      <pubDate>Tue, 14 Oct 2025 09:30:00 GMT</pubDate>
    </item>
    <item>
      <title>Only content</title>
      <link>https://example.com/b</link>
      <content:encoded>Full body text</content:encoded>
    </item>
  </channel>
</rss>"#;

        let entries = parse_xml_feed(xml).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Ceasefire talks resume");
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/a?x=1&y=2"));
        assert_eq!(entries[0].summary.as_deref(), Some("<p>Negotiators meet again</p>"));
        assert!(entries[0].published.is_some());
        assert_eq!(entries[1].summary.as_deref(), Some("Full body text"));
        assert!(entries[1].published.is_none());
    }

    #[test]
    fn test_parse_atom_entries() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom</title>
  <link href="https://example.com/"/>
  <entry>
    <title>Rates held steady</title>
    <link rel="self" href="https://example.com/self"/>
    <link rel="alternate" href="https://example.com/rates"/>
    <summary>The central bank paused</summary>
    <published>2025-10-14T09:30:00Z</published>
  </entry>
</feed>"#;

        let entries = parse_xml_feed(xml).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/rates"));
        assert_eq!(entries[0].summary.as_deref(), Some("The central bank paused"));
        assert!(entries[0].published.is_some());
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let err = parse_xml_feed("<rss><channel><item><title>x</item></rss>").unwrap_err();
        assert!(matches!(err, NewsError::Xml(_)));
    }

    #[test]
    fn test_published_wins_over_updated() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>Budget passes</title>
    <link href="https://example.com/budget"/>
    <updated>2025-10-15T12:00:00Z</updated>
    <published>2025-10-14T09:30:00Z</published>
  </entry>
  <entry>
    <title>Only updated</title>
    <link href="https://example.com/updated"/>
    <updated>2025-10-15T12:00:00Z</updated>
  </entry>
</feed>"#;

        let entries = parse_xml_feed(xml).unwrap();
        assert_eq!(entries[0].published, parse_feed_date("2025-10-14T09:30:00Z"));
        assert_eq!(entries[1].published, parse_feed_date("2025-10-15T12:00:00Z"));
        assert!(entries[1].published.is_some());
    }

    #[test]
    fn test_first_rss_date_is_kept() {
        let xml = r#"<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <item>
      <title>Port strike ends</title>
      <link>https://example.com/port</link>
      <pubDate>Tue, 14 Oct 2025 09:30:00 GMT</pubDate>
      <dc:date>2025-10-14T09:30:00Z</dc:date>
    </item>
  </channel>
</rss>"#;

        let entries = parse_xml_feed(xml).unwrap();
        assert_eq!(entries[0].published, parse_feed_date("2025-10-14T09:30:00Z"));
        assert!(entries[0].published.is_some());
    }

    #[test]
    fn test_media_extensions_do_not_leak_into_fields() {
        let xml = r#"<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <item>
      <title>Storm hits coast</title>
      <media:title>Photo credit AP</media:title>
      <link>https://example.com/storm</link>
      <description>Thousands without power</description>
      <media:description>Flooded street at dusk</media:description>
      <media:content url="https://example.com/storm.jpg"/>
    </item>
  </channel>
</rss>"#;

        let entries = parse_xml_feed(xml).unwrap();
        assert_eq!(entries[0].title, "Storm hits coast");
        assert_eq!(entries[0].summary.as_deref(), Some("Thousands without power"));
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/storm"));
    }

    #[test]
    fn test_repeated_field_keeps_first_value() {
        let xml = r#"<rss><channel><item>
  <title>First headline</title>
  <title>Second headline</title>
  <link>https://example.com/one</link>
</item></channel></rss>"#;

        let entries = parse_xml_feed(xml).unwrap();
        assert_eq!(entries[0].title, "First headline");
    }
}
