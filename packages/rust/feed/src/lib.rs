//! Feed download and parsing.
//!
//! The upstream feed (an RSS/Atom export of saved links) is fetched once per
//! run. Any failure here is fatal to the run: without the feed there are no
//! candidates, so [`CollectorError::FeedUnavailable`] is returned and nothing
//! is written.

mod parser;

use std::time::Duration;

use feedcollector_shared::{AppConfig, CollectorError, DEFAULT_USER_AGENT, Result};
use reqwest::Client;
use tracing::{info, instrument};

pub use parser::{ParsedFeed, parse_feed};

/// Maximum number of redirects to follow when fetching the feed.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for fetching the feed.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum feed size we accept (20 MB).
const MAX_FEED_SIZE: u64 = 20 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for the feed download.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Timeout for the HTTP request in seconds.
    pub timeout_secs: u64,
    /// User-Agent header.
    pub user_agent: String,
    /// Largest body accepted, in bytes.
    pub max_bytes: u64,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_bytes: MAX_FEED_SIZE,
        }
    }
}

impl From<&AppConfig> for FeedOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.feed.timeout_secs,
            user_agent: config.resolver.user_agent.clone(),
            max_bytes: MAX_FEED_SIZE,
        }
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Download and parse the feed at `url`.
#[instrument(skip_all)]
pub async fn fetch_feed(url: &str, opts: &FeedOptions) -> Result<ParsedFeed> {
    info!("fetching feed");

    let client = build_client(opts)?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CollectorError::FeedUnavailable(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CollectorError::FeedUnavailable(format!("HTTP {status}")));
    }

    let body = read_capped(response, opts.max_bytes).await?;

    let feed = parse_feed(&body)?;

    info!(
        title = %feed.title,
        entries = feed.entries.len(),
        "feed parsed"
    );

    Ok(feed)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read the body chunk by chunk, failing as soon as it exceeds `max_bytes`.
async fn read_capped(mut response: reqwest::Response, max_bytes: u64) -> Result<Vec<u8>> {
    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(too_large(max_bytes));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| CollectorError::FeedUnavailable(format!("failed to read body: {e}")))?
    {
        if (body.len() + chunk.len()) as u64 > max_bytes {
            return Err(too_large(max_bytes));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn too_large(max_bytes: u64) -> CollectorError {
    CollectorError::FeedUnavailable(format!("feed larger than {max_bytes} bytes"))
}

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &FeedOptions) -> Result<Client> {
    Client::builder()
        .user_agent(opts.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| CollectorError::config(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Saved</title>
    <item>
      <title>One</title>
      <link>https://example.com/one</link>
      <pubDate>Wed, 03 Jan 2024 08:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn test_fetch_feed_with_mock_server() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/feed"))
            .and(header("user-agent", "feed-test/0.1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let opts = FeedOptions {
            user_agent: "feed-test/0.1".into(),
            ..FeedOptions::default()
        };
        let feed = fetch_feed(&format!("{}/feed", server.uri()), &opts)
            .await
            .unwrap();

        assert_eq!(feed.title, "Saved");
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].link, "https://example.com/one");
    }

    #[tokio::test]
    async fn test_fetch_feed_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetch_feed(&server.uri(), &FeedOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::FeedUnavailable(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_feed_too_large() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let opts = FeedOptions {
            max_bytes: 64,
            ..FeedOptions::default()
        };
        let err = fetch_feed(&server.uri(), &opts).await.unwrap_err();

        assert!(matches!(err, CollectorError::FeedUnavailable(_)));
        assert!(err.to_string().contains("larger than 64 bytes"));
    }

    #[tokio::test]
    async fn test_fetch_feed_invalid_content() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login page</html>"))
            .mount(&server)
            .await;

        let err = fetch_feed(&server.uri(), &FeedOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::FeedUnavailable(_)));
    }
}
