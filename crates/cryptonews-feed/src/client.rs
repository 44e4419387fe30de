//! HTTP client for the CryptoPanic `posts` feed.
//!
//! Wraps `reqwest` with token handling and typed validation of each listed
//! post. The access token travels as a query parameter, so request URLs are
//! never logged and are stripped from surfaced transport errors.

use std::time::Duration;

use chrono::{DateTime, Utc};
use cryptonews_core::{HeadlineRecord, SourceAttribution};
use reqwest::{Client, Url};

use crate::error::FeedError;
use crate::types::{PostsResponse, RawPost};

const DEFAULT_BASE_URL: &str = "https://cryptopanic.com";
const POSTS_PATH: &str = "api/v1/posts/";

/// Client for the CryptoPanic headline feed.
///
/// Use [`CryptoPanicClient::new`] for production or
/// [`CryptoPanicClient::with_base_url`] to point at a mock server in tests.
pub struct CryptoPanicClient {
    client: Client,
    auth_token: String,
    base_url: Url,
}

impl std::fmt::Debug for CryptoPanicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoPanicClient")
            .field("auth_token", &"[redacted]")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CryptoPanicClient {
    /// Creates a client pointed at the production CryptoPanic API.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(auth_token: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, FeedError> {
        Self::with_base_url(auth_token, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the `reqwest::Client` cannot be built, or
    /// [`FeedError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        auth_token: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()
            .map_err(FeedError::Http)?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| FeedError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            auth_token: auth_token.to_owned(),
            base_url: parsed,
        })
    }

    /// Lists the latest headlines for `currencies` (comma-separated tickers)
    /// and `kind` (`news` or `media`), in feed order, truncated to `limit`.
    ///
    /// Posts that fail validation are skipped with a warning rather than
    /// failing the call.
    ///
    /// # Errors
    ///
    /// - [`FeedError::UpstreamUnavailable`] on a non-2xx status.
    /// - [`FeedError::Http`] on network failure.
    /// - [`FeedError::Deserialize`] if the envelope is not the expected shape.
    pub async fn list_latest(
        &self,
        currencies: &str,
        kind: &str,
        limit: usize,
    ) -> Result<Vec<HeadlineRecord>, FeedError> {
        let url = self.posts_url(currencies, kind, limit)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UpstreamUnavailable {
                status: status.as_u16(),
                endpoint: "cryptopanic posts",
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FeedError::Http(e.without_url()))?;
        let envelope: PostsResponse =
            serde_json::from_str(&body).map_err(|e| FeedError::Deserialize {
                context: format!("cryptopanic posts (currencies={currencies}, kind={kind})"),
                source: e,
            })?;

        let total = envelope.results.len();
        let headlines: Vec<HeadlineRecord> = envelope
            .results
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match validate_post(value) {
                Ok(record) => Some(record),
                Err(reason) => {
                    tracing::warn!(index, reason = %reason, "feed: skipping invalid post");
                    None
                }
            })
            .take(limit)
            .collect();

        tracing::debug!(
            listed = total,
            accepted = headlines.len(),
            "feed: fetched latest headlines"
        );
        Ok(headlines)
    }

    /// Builds the `posts` URL with percent-encoded query parameters.
    fn posts_url(&self, currencies: &str, kind: &str, limit: usize) -> Result<Url, FeedError> {
        let mut url = self
            .base_url
            .join(POSTS_PATH)
            .map_err(|e| FeedError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("auth_token", &self.auth_token)
            .append_pair("currencies", currencies)
            .append_pair("kind", kind)
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }
}

/// Turns one raw feed item into a typed record, or explains why it was rejected.
fn validate_post(value: serde_json::Value) -> Result<HeadlineRecord, String> {
    let raw: RawPost = serde_json::from_value(value).map_err(|e| format!("malformed post: {e}"))?;

    let title = non_blank(raw.title).ok_or("missing title")?;
    let url = non_blank(raw.url).ok_or("missing url")?;
    match Url::parse(&url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => return Err(format!("unsupported url scheme '{}'", parsed.scheme())),
        Err(e) => return Err(format!("invalid url: {e}")),
    }

    let published_raw = non_blank(raw.published_at).ok_or("missing published_at")?;
    let published_at = DateTime::parse_from_rfc3339(&published_raw)
        .map_err(|e| format!("invalid published_at '{published_raw}': {e}"))?
        .with_timezone(&Utc);

    let source = raw.source.ok_or("missing source")?;
    let source = SourceAttribution {
        title: source.title.unwrap_or_default().trim().to_string(),
        domain: source.domain.unwrap_or_default().trim().to_string(),
    };

    Ok(HeadlineRecord {
        title,
        url,
        published_at,
        source,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_client(base_url: &str) -> CryptoPanicClient {
        CryptoPanicClient::with_base_url("test-token", 30, "cryptonews-test/0.1", base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn posts_url_constructs_query_string() {
        let client = test_client("https://cryptopanic.com");
        let url = client.posts_url("BTC", "news", 10).unwrap();
        assert_eq!(
            url.as_str(),
            "https://cryptopanic.com/api/v1/posts/?auth_token=test-token&currencies=BTC&kind=news&limit=10"
        );
    }

    #[test]
    fn posts_url_keeps_base_path_prefix() {
        let client = test_client("http://localhost:9000/proxy/");
        let url = client.posts_url("BTC,ETH", "media", 5).unwrap();
        assert!(url.as_str().starts_with("http://localhost:9000/proxy/api/v1/posts/?"));
        assert!(url.as_str().contains("currencies=BTC%2CETH"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = CryptoPanicClient::with_base_url("t", 30, "ua", "not a url").unwrap_err();
        assert!(matches!(err, FeedError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn debug_output_redacts_token() {
        let client = test_client("https://cryptopanic.com");
        let debug = format!("{client:?}");
        assert!(!debug.contains("test-token"));
    }

    #[test]
    fn validate_post_accepts_complete_item() {
        let record = validate_post(json!({
            "title": " A ",
            "url": "https://cryptopanic.com/news/1/a",
            "published_at": "2024-01-01T00:00:00Z",
            "source": { "title": "S1", "domain": "s1.com" }
        }))
        .expect("valid");
        assert_eq!(record.title, "A");
        assert_eq!(record.source.domain, "s1.com");
    }

    #[test]
    fn validate_post_rejects_bad_items() {
        let missing_title = json!({
            "url": "https://x.test/a",
            "published_at": "2024-01-01T00:00:00Z",
            "source": { "title": "S", "domain": "s" }
        });
        assert!(validate_post(missing_title).unwrap_err().contains("title"));

        let bad_scheme = json!({
            "title": "A",
            "url": "ftp://x.test/a",
            "published_at": "2024-01-01T00:00:00Z",
            "source": { "title": "S", "domain": "s" }
        });
        assert!(validate_post(bad_scheme).unwrap_err().contains("scheme"));

        let bad_date = json!({
            "title": "A",
            "url": "https://x.test/a",
            "published_at": "yesterday",
            "source": { "title": "S", "domain": "s" }
        });
        assert!(validate_post(bad_date).unwrap_err().contains("published_at"));

        let no_source = json!({
            "title": "A",
            "url": "https://x.test/a",
            "published_at": "2024-01-01T00:00:00Z"
        });
        assert!(validate_post(no_source).unwrap_err().contains("source"));
    }
}
