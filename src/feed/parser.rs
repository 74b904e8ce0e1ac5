use anyhow::Result;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use sha2::{Digest, Sha256};

/// One entry taken from a source feed.
///
/// Only `published` takes part in filtering and ordering. The remaining
/// fields are carried through to the combined document as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntry {
    pub guid: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub comments: Option<String>,
    /// Feed this entry was fetched from.
    pub origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Origin {
    pub url: String,
    pub title: Option<String>,
}

/// A source feed after parsing.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

/// Parses RSS, Atom or JSON Feed bytes fetched from `source_url`.
///
/// Entries come back in document order.
pub fn parse_feed(bytes: &[u8], source_url: &str) -> Result<ParsedFeed> {
    let feed = parser::parse(bytes)?;

    let feed_title = feed.title.map(|t| t.content);
    let origin = Origin {
        url: source_url.to_string(),
        title: feed_title.clone(),
    };

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            // Atom threading links (rel="replies")
            let comments = entry
                .links
                .iter()
                .find(|l| l.rel.as_deref() == Some("replies") || l.rel.as_deref() == Some("comments"))
                .map(|l| l.href.clone());
            let link = entry
                .links
                .iter()
                .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
                .or_else(|| entry.links.first())
                .map(|l| l.href.clone());
            let published = entry.published.or(entry.updated);
            let title = entry.title.map(|t| t.content);
            let summary = entry.summary.map(|s| s.content);
            let content = entry.content.and_then(|c| c.body);
            let authors = entry
                .authors
                .into_iter()
                .map(|p| p.name)
                .filter(|n| !n.trim().is_empty())
                .collect();
            let categories = entry
                .categories
                .into_iter()
                .map(|c| c.label.unwrap_or(c.term))
                .collect();

            let existing_id = if entry.id.is_empty() {
                None
            } else {
                Some(entry.id.as_str())
            };
            let guid = generate_guid(existing_id, link.as_deref(), title.as_deref(), published);

            ParsedEntry {
                guid,
                title,
                link,
                published,
                summary,
                content,
                authors,
                categories,
                comments,
                origin: origin.clone(),
            }
        })
        .collect();

    Ok(ParsedFeed {
        title: feed_title,
        entries,
    })
}

fn generate_guid(
    existing: Option<&str>,
    url: Option<&str>,
    title: Option<&str>,
    published: Option<DateTime<Utc>>,
) -> String {
    if let Some(guid) = existing {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}|{}",
        url.unwrap_or(""),
        title.unwrap_or(""),
        published.map(|p| p.timestamp().to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
