use crate::types::{Article, ArticleCluster, DashboardSnapshot, OutletSection, Result};
use crate::utils::text::smart_truncate;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::str::FromStr;

pub const DASHBOARD_TITLE: &str = "Global News Intelligence Dashboard";
pub const DETAILS_TITLE: &str = "Summary · Fact check · Opposing views";
pub const NO_SUMMARY: &str = "No summary";
pub const FACT_CHECK_NOTE: &str = "Fact-check: AI review pending";
pub const OPPOSING_VIEWS_NOTE: &str = "Opposing viewpoints: cross-source analysis";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const PLAIN_SUMMARY_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Plain,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "plain" | "text" => Ok(OutputFormat::Plain),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{}', expected markdown, plain or json", other)),
        }
    }
}

/// Turns a snapshot into text for the terminal or a file
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    format: OutputFormat,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn render(&self, snapshot: &DashboardSnapshot) -> Result<String> {
        match self.format {
            OutputFormat::Markdown => Ok(render_markdown(snapshot)),
            OutputFormat::Plain => Ok(render_plain(snapshot)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(snapshot)?),
        }
    }
}

fn timestamp(snapshot: &DashboardSnapshot) -> String {
    snapshot.generated_at.format(TIMESTAMP_FORMAT).to_string()
}

fn escape_link_text(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

// `write!` into a String cannot fail, so results below are ignored.

fn render_markdown(snapshot: &DashboardSnapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {}\n", DASHBOARD_TITLE);
    let _ = writeln!(out, "_{}_\n", timestamp(snapshot));
    if let Some(keyword) = &snapshot.keyword {
        let _ = writeln!(out, "_Filtered by keyword: \"{}\"_\n", keyword);
    }

    for (i, section) in snapshot.sections.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n\n");
        }
        markdown_section(&mut out, section);
    }

    if !snapshot.clusters.is_empty() {
        out.push_str("---\n\n## Topic clusters\n\n");
        for cluster in &snapshot.clusters {
            markdown_cluster(&mut out, cluster);
        }
    }

    out
}

fn markdown_section(out: &mut String, section: &OutletSection) {
    let _ = writeln!(out, "## {}\n", section.outlet.name);

    if let Some(error) = &section.error {
        let _ = writeln!(out, "> ⚠️ Could not load {}: {}\n", section.outlet.name, error);
        return;
    }
    if section.articles.is_empty() {
        out.push_str("_No articles_\n\n");
        return;
    }

    for article in &section.articles {
        markdown_article(out, article);
    }
}

fn markdown_article(out: &mut String, article: &Article) {
    let _ = writeln!(out, "**[{}]({})**\n", escape_link_text(&article.title), article.link);
    let _ = writeln!(out, "_Bias: {} | Reliability: {}_\n", article.bias, article.reliability);
    let _ = writeln!(out, "<details>\n<summary>{}</summary>\n", DETAILS_TITLE);
    // Summaries are plain text inside an HTML block
    let summary = article.summary.as_deref().unwrap_or(NO_SUMMARY);
    let _ = writeln!(out, "{}\n", html_escape::encode_text(summary));
    let _ = writeln!(out, "{}\n", FACT_CHECK_NOTE);
    let _ = writeln!(out, "{}\n", OPPOSING_VIEWS_NOTE);
    out.push_str("</details>\n\n");
}

fn markdown_cluster(out: &mut String, cluster: &ArticleCluster) {
    let _ = writeln!(
        out,
        "### {}. {} ({} articles, {} outlets)\n",
        cluster.id,
        cluster.label,
        cluster.size(),
        cluster.outlet_count()
    );
    for article in &cluster.articles {
        let _ = writeln!(
            out,
            "- [{}]({}) · {}",
            escape_link_text(&article.title),
            article.link,
            article.outlet
        );
    }
    out.push('\n');
}

fn render_plain(snapshot: &DashboardSnapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", DASHBOARD_TITLE);
    let _ = writeln!(out, "{}", timestamp(snapshot));
    if let Some(keyword) = &snapshot.keyword {
        let _ = writeln!(out, "Keyword: {}", keyword);
    }

    for section in &snapshot.sections {
        let _ = writeln!(out, "\n== {} ==", section.outlet.name);
        if let Some(error) = &section.error {
            let _ = writeln!(out, "  ! Could not load {}: {}", section.outlet.name, error);
            continue;
        }
        for article in &section.articles {
            let _ = writeln!(out, "  * {}", article.title);
            let _ = writeln!(out, "    {}", article.link);
            let _ = writeln!(out, "    Bias: {} | Reliability: {}", article.bias, article.reliability);
            let summary = article
                .summary
                .as_deref()
                .map_or_else(|| NO_SUMMARY.to_string(), |s| smart_truncate(s, PLAIN_SUMMARY_CHARS));
            let _ = writeln!(out, "    {}", summary);
        }
    }

    if !snapshot.clusters.is_empty() {
        out.push_str("\n== Topic clusters ==\n");
        for cluster in &snapshot.clusters {
            let _ = writeln!(out, "  [{}] {} ({} articles)", cluster.id, cluster.label, cluster.size());
            for article in &cluster.articles {
                let _ = writeln!(out, "      - {} ({})", article.title, article.outlet);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::article_id;
    use crate::types::OutletDescriptor;
    use chrono::{TimeZone, Utc};

    fn article(outlet: &str, title: &str, summary: Option<&str>) -> Article {
        let link = format!("https://{}.example.com/{}", outlet.to_lowercase(), title.len());
        Article {
            id: article_id(&link),
            outlet: outlet.to_string(),
            bias: "Center-Left".to_string(),
            reliability: "High".to_string(),
            title: title.to_string(),
            summary: summary.map(str::to_string),
            link,
            published_at: None,
        }
    }

    fn snapshot() -> DashboardSnapshot {
        let bbc = OutletDescriptor::new("BBC", "https://feeds.bbci.co.uk/news/rss.xml", "Center-Left", "High");
        let npr = OutletDescriptor::new("NPR", "https://feeds.npr.org/1001/rss.xml", "Center-Left", "High");
        let down = OutletDescriptor::new("Down", "https://down.example.com/rss", "Center", "Low");

        let a = article("BBC", "Storm hits [coast]", Some("Heavy rain expected"));
        let b = article("NPR", "Coast storm", None);

        DashboardSnapshot {
            refresh: 1,
            generated_at: Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap(),
            keyword: Some("storm".to_string()),
            sections: vec![
                OutletSection { outlet: bbc, articles: vec![a.clone()], error: None },
                OutletSection { outlet: npr, articles: vec![b.clone()], error: None },
                OutletSection { outlet: down, articles: Vec::new(), error: Some("HTTP 503".to_string()) },
            ],
            clusters: vec![ArticleCluster {
                id: 1,
                label: "coast, storm".to_string(),
                terms: vec!["coast".to_string(), "storm".to_string()],
                headline: "Coast storm".to_string(),
                articles: vec![a, b],
            }],
            total_articles: 2,
        }
    }

    #[test]
    fn test_markdown_layout() {
        let out = Renderer::new(OutputFormat::Markdown).render(&snapshot()).unwrap();

        assert!(out.starts_with("# Global News Intelligence Dashboard\n"));
        assert!(out.contains("_2024-03-05 14:07:09_"));
        assert!(out.contains("## BBC"));
        assert!(out.contains("**[Storm hits \\[coast\\]](https://bbc.example.com/18)**"));
        assert!(out.contains("_Bias: Center-Left | Reliability: High_"));
        assert!(out.contains("<summary>Summary · Fact check · Opposing views</summary>"));
        assert!(out.contains("Heavy rain expected"));
        assert!(out.contains("No summary"));
        assert_eq!(out.matches(FACT_CHECK_NOTE).count(), 2);
        assert_eq!(out.matches(OPPOSING_VIEWS_NOTE).count(), 2);
        assert!(out.contains("Could not load Down: HTTP 503"));
        assert!(out.contains("## Topic clusters"));
        assert!(out.contains("### 1. coast, storm (2 articles, 2 outlets)"));

        // Sections appear in snapshot order with dividers between them
        let bbc = out.find("## BBC").unwrap();
        let npr = out.find("## NPR").unwrap();
        assert!(bbc < npr);
        assert!(out[bbc..npr].contains("---"));
    }

    #[test]
    fn test_markup_in_summary_is_escaped() {
        let mut snapshot = snapshot();
        snapshot.sections[0].articles[0].summary = Some("<script>alert(1)</script> & more".to_string());

        let out = Renderer::new(OutputFormat::Markdown).render(&snapshot).unwrap();
        assert!(out.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; more"));
        assert!(!out.contains("<script>"));
    }

    #[test]
    fn test_plain_layout() {
        let out = Renderer::new(OutputFormat::Plain).render(&snapshot()).unwrap();
        assert!(out.contains("== BBC =="));
        assert!(out.contains("  * Coast storm"));
        assert!(out.contains("! Could not load Down"));
        assert!(out.contains("[1] coast, storm (2 articles)"));
        assert!(!out.contains("<details>"));
    }

    #[test]
    fn test_json_round_trips_snapshot() {
        let snapshot = snapshot();
        let out = Renderer::new(OutputFormat::Json).render(&snapshot).unwrap();
        let parsed: DashboardSnapshot = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("MD".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Plain);
        assert!("html".parse::<OutputFormat>().is_err());
    }
}
