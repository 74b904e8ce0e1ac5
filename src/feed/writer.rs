use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

use crate::feed::parser::ParsedEntry;
use crate::util::atomic_write;

pub const CHANNEL_TITLE: &str = "Aggregated RSS Feed";
pub const CHANNEL_DESCRIPTION: &str = "Entries merged from multiple syndication feeds";
pub const CHANNEL_LINK: &str = "urn:feedmerge:aggregated-feed";

const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

/// The combined feed: fixed channel metadata around the merged entries.
#[derive(Debug, Clone)]
pub struct AggregatedFeed {
    pub title: String,
    pub description: String,
    pub link: String,
    pub last_updated: DateTime<Utc>,
    pub items: Vec<ParsedEntry>,
}

impl AggregatedFeed {
    /// Wraps `items` in the standard envelope, stamped with `now`.
    pub fn new(items: Vec<ParsedEntry>, now: DateTime<Utc>) -> Self {
        Self {
            title: CHANNEL_TITLE.to_string(),
            description: CHANNEL_DESCRIPTION.to_string(),
            link: CHANNEL_LINK.to_string(),
            last_updated: now,
            items,
        }
    }
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn write_text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write <{}>", name))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .with_context(|| format!("Failed to write <{}> text", name))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write </{}>", name))?;
    Ok(())
}

/// Serializes the feed as an indented RSS 2.0 document.
pub fn render_rss(feed: &AggregatedFeed) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:content", CONTENT_NS));
    rss.push_attribute(("xmlns:dc", DC_NS));
    writer
        .write_event(Event::Start(rss))
        .context("Failed to write rss element")?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .context("Failed to write channel element")?;

    write_text_element(&mut writer, "title", &feed.title)?;
    write_text_element(&mut writer, "link", &feed.link)?;
    write_text_element(&mut writer, "description", &feed.description)?;
    write_text_element(&mut writer, "lastBuildDate", &feed.last_updated.to_rfc2822())?;
    write_text_element(
        &mut writer,
        "generator",
        concat!("feedmerge ", env!("CARGO_PKG_VERSION")),
    )?;

    for item in &feed.items {
        write_item(&mut writer, item)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .context("Failed to write channel end")?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .context("Failed to write rss end")?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).context("Generated RSS contains invalid UTF-8")
}

fn write_item(writer: &mut XmlWriter, item: &ParsedEntry) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .context("Failed to write item element")?;

    if let Some(ref title) = item.title {
        write_text_element(writer, "title", title)?;
    }
    if let Some(ref link) = item.link {
        write_text_element(writer, "link", link)?;
    }
    if let Some(ref summary) = item.summary {
        write_text_element(writer, "description", summary)?;
    }
    if let Some(ref content) = item.content {
        write_text_element(writer, "content:encoded", content)?;
    }
    for author in &item.authors {
        write_text_element(writer, "dc:creator", author)?;
    }
    for category in &item.categories {
        write_text_element(writer, "category", category)?;
    }
    if let Some(ref comments) = item.comments {
        write_text_element(writer, "comments", comments)?;
    }

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "false"));
    writer
        .write_event(Event::Start(guid))
        .context("Failed to write guid element")?;
    writer
        .write_event(Event::Text(BytesText::new(&item.guid)))
        .context("Failed to write guid text")?;
    writer
        .write_event(Event::End(BytesEnd::new("guid")))
        .context("Failed to write guid end")?;

    if let Some(published) = item.published {
        write_text_element(writer, "pubDate", &published.to_rfc2822())?;
    }

    // <source> requires a url attribute; only emit it when the origin is known
    if !item.origin.url.is_empty() {
        let mut source = BytesStart::new("source");
        source.push_attribute(("url", item.origin.url.as_str()));
        let label = item.origin.title.as_deref().unwrap_or(&item.origin.url);
        writer
            .write_event(Event::Start(source))
            .context("Failed to write source element")?;
        writer
            .write_event(Event::Text(BytesText::new(label)))
            .context("Failed to write source text")?;
        writer
            .write_event(Event::End(BytesEnd::new("source")))
            .context("Failed to write source end")?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .context("Failed to write item end")?;
    Ok(())
}

/// Renders the feed and writes it to `path` atomically.
///
/// Returns the number of items written. On failure no output file is
/// created and an existing one is left unchanged.
pub fn write_to_file(feed: &AggregatedFeed, path: &Path) -> Result<usize> {
    let content = render_rss(feed)?;
    atomic_write(path, content.as_bytes())
        .with_context(|| format!("Failed to write output feed '{}'", path.display()))?;
    Ok(feed.items.len())
}
