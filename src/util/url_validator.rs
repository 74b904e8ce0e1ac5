use thiserror::Error;
use url::Url;

/// Errors that can occur while validating a feed address.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The address could not be parsed as a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http, https or file.
    #[error("Unsupported scheme: {0} (only http/https/file allowed)")]
    UnsupportedScheme(String),
    /// An http(s) URL without a host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a source-list line for use as a feed address.
///
/// Accepts `http`, `https` and `file` URLs. Network URLs must carry a host.
/// Loopback and private addresses are allowed: the source list is written
/// by the person running the tool, and local mirrors are a normal setup.
///
/// # Examples
///
/// ```
/// use feedmerge::util::validate_url;
///
/// let url = validate_url("https://example.com/feed.xml").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(validate_url("not a url").is_err());
/// assert!(validate_url("ftp://example.com/feed").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {
            if url.host_str().map_or(true, str::is_empty) {
                return Err(UrlValidationError::MissingHost);
            }
        }
        "file" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_url("https://example.com/feed.xml").is_ok());
        assert!(validate_url("http://news.example.org").is_ok());
        assert!(validate_url("file:///var/feeds/local.xml").is_ok());
    }

    #[test]
    fn test_plain_text_rejected() {
        let err = validate_url("this is not a url").unwrap_err();
        assert!(matches!(err, UrlValidationError::InvalidUrl(_)));
    }

    #[test]
    fn test_relative_path_rejected() {
        assert!(validate_url("feeds/local.xml").is_err());
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_url("ftp://example.com"),
            Err(UrlValidationError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(validate_url("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_loopback_accepted() {
        assert!(validate_url("http://127.0.0.1:8080/feed").is_ok());
        assert!(validate_url("http://localhost/feed").is_ok());
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let url = validate_url("  https://example.com/rss  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/rss");
    }
}
