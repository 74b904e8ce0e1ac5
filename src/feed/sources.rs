use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::feed::opml::{self, OpmlError};

/// Errors that can occur while loading the source list.
///
/// All of these are fatal to a run.
#[derive(Debug, Error)]
pub enum SourceListError {
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read input file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid OPML in {}: {source}", path.display())]
    Opml {
        path: PathBuf,
        #[source]
        source: OpmlError,
    },
}

/// Reads the ordered list of feed addresses from `path`.
///
/// Plain text files hold one address per line. Blank lines are dropped,
/// everything else is kept verbatim (trimmed) with no validation or
/// deduplication. An OPML document is
/// accepted too, in which case its `xmlUrl` attributes are used.
///
/// The file is never created: a missing path is
/// [`SourceListError::NotFound`].
pub fn load_sources(path: &Path) -> Result<Vec<String>, SourceListError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SourceListError::NotFound(path.to_path_buf())
        } else {
            SourceListError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    if opml::is_opml(&content) {
        tracing::debug!(path = %path.display(), "Reading source list as OPML");
        return opml::feed_urls(&content).map_err(|source| SourceListError::Opml {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(parse_source_lines(&content))
}

fn parse_source_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
