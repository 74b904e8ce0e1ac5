use crate::config::Config;
use crate::feed::parser::{parse_feed, ParsedFeed};
use crate::util::{validate_url, UrlValidationError};
use futures::stream::StreamExt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur while retrieving one source.
///
/// Every variant is recoverable at the aggregation loop: the source is
/// skipped and the run continues.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source-list line is not a usable feed address
    #[error("Malformed address: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// A `file://` URL that does not map to a local path
    #[error("Malformed file address: {0}")]
    InvalidPath(String),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    /// Content could not be parsed as RSS, Atom or JSON Feed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the configured size limit
    #[error("Response too large (limit {0} bytes)")]
    ResponseTooLarge(usize),
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Local feed file could not be read
    #[error("Failed to read local feed: {0}")]
    Io(#[from] std::io::Error),
}

/// Retrieves and parses feeds one address at a time.
///
/// Holds a single HTTP client for the whole run. Each call to
/// [`Fetcher::fetch`] is independent: whatever happens to one source has
/// no effect on the next.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl Fetcher {
    /// Builds a fetcher from the run configuration.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self::with_client(
            client,
            Duration::from_secs(config.request_timeout_secs),
            config.max_feed_bytes as usize,
        ))
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration, max_bytes: usize) -> Self {
        Self {
            client,
            timeout,
            max_bytes,
        }
    }

    /// Fetches and parses one source address.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] / [`FetchError::InvalidPath`] - malformed address
    /// - [`FetchError::Network`], [`FetchError::Timeout`], [`FetchError::HttpStatus`],
    ///   [`FetchError::ResponseTooLarge`], [`FetchError::IncompleteResponse`],
    ///   [`FetchError::Io`] - retrieval failures
    /// - [`FetchError::Parse`] - content is not a feed
    pub async fn fetch(&self, address: &str) -> Result<ParsedFeed, FetchError> {
        let url = validate_url(address)?;

        let bytes = match url.scheme() {
            "file" => self.read_local(&url).await?,
            _ => {
                let timeout_secs = self.timeout.as_secs();
                tokio::time::timeout(self.timeout, self.fetch_remote(&url))
                    .await
                    .map_err(|_| FetchError::Timeout(timeout_secs))??
            }
        };

        parse_feed(&bytes, url.as_str()).map_err(|e| FetchError::Parse(e.to_string()))
    }

    async fn fetch_remote(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url.as_str()).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_bytes).await
    }

    async fn read_local(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let path = url
            .to_file_path()
            .map_err(|_| FetchError::InvalidPath(url.to_string()))?;

        let metadata = tokio::fs::metadata(&path).await?;
        if metadata.len() > self.max_bytes as u64 {
            return Err(FetchError::ResponseTooLarge(self.max_bytes));
        }

        Ok(tokio::fs::read(&path).await?)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Test</title>
    <item><guid>1</guid><title>Test</title></item>
</channel></rss>"#;

    fn test_fetcher() -> Fetcher {
        Fetcher::with_client(reqwest::Client::new(), Duration::from_secs(5), 1024 * 1024)
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/xml"),
            )
            .mount(&mock_server)
            .await;

        let feed = test_fetcher()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].guid, "1");
    }

    #[tokio::test]
    async fn test_fetch_404_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let result = test_fetcher()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await;
        match result {
            Err(FetchError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other.map(|f| f.entries.len())),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = test_fetcher()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::HttpStatus(503))));
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        let result = test_fetcher()
            .fetch(&format!("{}/feed", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_malformed_address() {
        let result = test_fetcher().fetch("definitely not a url").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_response_too_large() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
            .mount(&mock_server)
            .await;

        let fetcher = Fetcher::with_client(reqwest::Client::new(), Duration::from_secs(5), 1024);
        let result = fetcher.fetch(&format!("{}/feed", mock_server.uri())).await;
        assert!(matches!(result, Err(FetchError::ResponseTooLarge(1024))));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let fetcher =
            Fetcher::with_client(reqwest::Client::new(), Duration::from_millis(200), 1024 * 1024);
        let result = fetcher.fetch(&format!("{}/feed", mock_server.uri())).await;
        assert!(matches!(result, Err(FetchError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = std::env::temp_dir().join("feedmerge_fetch_local");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("feed.xml");
        std::fs::write(&path, VALID_RSS).unwrap();

        let url = Url::from_file_path(&path).unwrap();
        let feed = test_fetcher().fetch(url.as_str()).await.unwrap();
        assert_eq!(feed.title.as_deref(), Some("Test"));
        assert_eq!(feed.entries[0].origin.url, url.as_str());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let url = Url::from_file_path(
            std::env::temp_dir().join("feedmerge_fetch_missing/nope.xml"),
        )
        .unwrap();
        let result = test_fetcher().fetch(url.as_str()).await;
        assert!(matches!(result, Err(FetchError::Io(_))));
    }
}
