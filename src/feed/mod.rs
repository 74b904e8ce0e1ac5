//! Feed pipeline: load sources, fetch and merge, write the combined feed.
//!
//! - [`sources`] - source list loading (plain text or OPML)
//! - [`fetcher`] - per-source retrieval over HTTP(S) or from `file://` URLs
//! - [`parser`] - RSS/Atom/JSON Feed parsing via `feed-rs`
//! - [`aggregate`] - merge, date filter, newest-first ordering
//! - [`writer`] - RSS 2.0 output via `quick-xml`
//!
//! # Example
//!
//! ```ignore
//! use feedmerge::feed::{aggregate, load_sources, write_to_file, AggregatedFeed, Fetcher};
//!
//! let sources = load_sources(Path::new("feeds.txt"))?;
//! let result = aggregate(&fetcher, &sources, threshold).await;
//! write_to_file(&AggregatedFeed::new(result.entries, Utc::now()), Path::new("out.xml"))?;
//! ```

pub mod aggregate;
pub mod fetcher;
mod opml;
pub mod parser;
pub mod sources;
pub mod writer;

pub use aggregate::{aggregate, Aggregation, SourceFailure};
pub use fetcher::{FetchError, Fetcher};
pub use opml::OpmlError;
pub use parser::{parse_feed, Origin, ParsedEntry, ParsedFeed};
pub use sources::{load_sources, SourceListError};
pub use writer::{render_rss, write_to_file, AggregatedFeed};
