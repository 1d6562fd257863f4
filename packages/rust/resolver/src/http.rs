//! HTTP link resolver.
//!
//! Fetches a page once, follows redirects, and reads the `<title>` from the
//! document head. A page without a title still resolves; only transport
//! failures and error statuses are reported as [`FetchError`].

use std::sync::LazyLock;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use feedcollector_shared::{CollectorError, FetchError, ResolverConfig, Result, UNTITLED};

use crate::fast_path::FastPathRegistry;
use crate::{Resolution, Resolve};

/// Maximum number of redirects to follow per link.
const MAX_REDIRECTS: usize = 10;

/// Bodies larger than this are not parsed for a title (5 MB).
const MAX_BODY_SIZE: u64 = 5 * 1024 * 1024;

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head title").expect("valid selector"));

// ---------------------------------------------------------------------------
// HttpResolver
// ---------------------------------------------------------------------------

/// Production resolver: one GET per link through a shared connection pool.
pub struct HttpResolver {
    client: Client,
    fast_paths: FastPathRegistry,
    max_body: u64,
}

impl HttpResolver {
    /// Create a resolver with the given configuration.
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(config.timeout)
            .build()
            .map_err(|e| CollectorError::config(format!("failed to build HTTP client: {e}")))?;

        let fast_paths = if config.fast_paths {
            FastPathRegistry::new()
        } else {
            FastPathRegistry::empty()
        };

        Ok(Self {
            client,
            fast_paths,
            max_body: MAX_BODY_SIZE,
        })
    }

    /// Resolve a link: fast path when one applies, otherwise fetch it.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self, url: &str) -> std::result::Result<Resolution, FetchError> {
        if let Ok(parsed) = Url::parse(url) {
            if let Some((strategy, resolution)) = self.fast_paths.resolve(&parsed) {
                debug!(strategy, title = %resolution.title, "resolved via fast path");
                return Ok(resolution);
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus(status.as_u16()));
        }

        let final_url = response.url().to_string();

        let title = match read_capped(response, self.max_body).await {
            Ok(Some(body)) => extract_title(&String::from_utf8_lossy(&body)),
            Ok(None) => {
                debug!(%final_url, "body too large, skipping title extraction");
                None
            }
            Err(e) => {
                debug!(%final_url, error = %e, "failed to read body");
                None
            }
        };

        Ok(Resolution {
            final_url,
            title: title.unwrap_or_else(|| UNTITLED.to_string()),
        })
    }
}

impl Resolve for HttpResolver {
    async fn resolve(&self, url: &str) -> std::result::Result<Resolution, FetchError> {
        self.fetch(url).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Text of the first `<title>` under `<head>`, if it has any visible content.
pub fn extract_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&TITLE_SEL)
        .next()
        .map(|el| el.text().collect::<String>())
        .filter(|title| !title.trim().is_empty())
}

/// Body bytes, or `None` once more than `max_bytes` have arrived.
async fn read_capped(
    mut response: reqwest::Response,
    max_bytes: u64,
) -> std::result::Result<Option<Vec<u8>>, reqwest::Error> {
    if response.content_length().is_some_and(|len| len > max_bytes) {
        return Ok(None);
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if (body.len() + chunk.len()) as u64 > max_bytes {
            return Ok(None);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(Some(body))
}

/// Short cause for a transport error, including the source chain.
fn describe(err: &reqwest::Error) -> String {
    use std::error::Error;

    if err.is_timeout() {
        return "timed out".to_string();
    }
    if err.is_redirect() {
        return format!("too many redirects: {err}");
    }

    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> ResolverConfig {
        ResolverConfig {
            concurrency: 4,
            timeout: Duration::from_secs(5),
            user_agent: "feedcollector-test/1.0".into(),
            allowed_query_params: vec![],
            fast_paths: true,
        }
    }

    #[test]
    fn test_extract_title() {
        let html = "<html><head><title> Hello &amp; welcome </title></head><body></body></html>";
        assert_eq!(extract_title(html).as_deref(), Some(" Hello & welcome "));
    }

    #[test]
    fn test_extract_title_missing() {
        assert_eq!(extract_title("<html><body><h1>No title</h1></body></html>"), None);
        assert_eq!(extract_title("<html><head><title>  </title></head></html>"), None);
        assert_eq!(extract_title(""), None);
    }

    #[tokio::test]
    async fn test_fetch_reads_title_and_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post"))
            .and(header("user-agent", "feedcollector-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><title>A Post</title></head><body>hi</body></html>",
            ))
            .mount(&server)
            .await;

        let resolver = HttpResolver::new(&config()).unwrap();
        let url = format!("{}/post", server.uri());
        let resolution = resolver.fetch(&url).await.unwrap();

        assert_eq!(resolution.title, "A Post");
        assert_eq!(resolution.final_url, url);
    }

    #[tokio::test]
    async fn test_fetch_follows_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/short"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("Location", format!("{}/article?utm_source=x", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><title>Landing</title></head></html>",
            ))
            .mount(&server)
            .await;

        let resolver = HttpResolver::new(&config()).unwrap();
        let resolution = resolver
            .fetch(&format!("{}/short", server.uri()))
            .await
            .unwrap();

        assert_eq!(
            resolution.final_url,
            format!("{}/article?utm_source=x", server.uri())
        );
        assert_eq!(resolution.title, "Landing");
    }

    #[tokio::test]
    async fn test_fetch_without_title_is_untitled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain text, no html"))
            .mount(&server)
            .await;

        let resolver = HttpResolver::new(&config()).unwrap();
        let resolution = resolver.fetch(&server.uri()).await.unwrap();
        assert_eq!(resolution.title, UNTITLED);
    }

    #[tokio::test]
    async fn test_fetch_oversized_body_is_untitled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><title>Far too long for the limit</title></head></html>",
            ))
            .mount(&server)
            .await;

        let mut resolver = HttpResolver::new(&config()).unwrap();
        resolver.max_body = 16;
        let resolution = resolver.fetch(&server.uri()).await.unwrap();
        assert_eq!(resolution.final_url, format!("{}/", server.uri()));
        assert_eq!(resolution.title, UNTITLED);
    }

    #[tokio::test]
    async fn test_fetch_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolver = HttpResolver::new(&config()).unwrap();
        let err = resolver.fetch(&server.uri()).await.unwrap_err();
        assert_eq!(err, FetchError::BadStatus(404));
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        // Bind then drop a listener so the port is known to be closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let resolver = HttpResolver::new(&config()).unwrap();
        let err = resolver
            .fetch(&format!("http://127.0.0.1:{port}/gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<title>late</title>")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let mut cfg = config();
        cfg.timeout = Duration::from_millis(200);
        let resolver = HttpResolver::new(&cfg).unwrap();
        let err = resolver.fetch(&server.uri()).await.unwrap_err();
        assert_eq!(err, FetchError::Unreachable("timed out".into()));
    }

    #[tokio::test]
    async fn test_invalid_url_is_unreachable() {
        let resolver = HttpResolver::new(&config()).unwrap();
        let err = resolver.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_github_fast_path_skips_network() {
        // A real fetch would return GitHub's own page title
        let resolver = HttpResolver::new(&config()).unwrap();
        let resolution = resolver
            .fetch("https://github.com/rust-lang/rust/issues/1?utm_source=feed")
            .await
            .unwrap();
        assert_eq!(resolution.title, "GitHub - rust-lang/rust/issues/1");
        assert_eq!(
            resolution.final_url,
            "https://github.com/rust-lang/rust/issues/1?utm_source=feed"
        );
    }
}
