//! Integration tests for `CryptoPanicClient` using wiremock HTTP mocks.

use cryptonews_feed::{CryptoPanicClient, FeedError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> CryptoPanicClient {
    CryptoPanicClient::with_base_url("test-token", 30, "cryptonews-test/0.1", base_url)
        .expect("client construction should not fail")
}

fn post(title: &str, url: &str, published_at: &str) -> serde_json::Value {
    serde_json::json!({
        "kind": "news",
        "title": title,
        "url": url,
        "published_at": published_at,
        "source": { "title": "S1", "region": "en", "domain": "s1.com", "path": null },
        "votes": { "positive": 3, "negative": 0 }
    })
}

#[tokio::test]
async fn list_latest_returns_validated_headlines_in_feed_order() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "count": 3,
        "next": null,
        "results": [
            post("A", "https://cryptopanic.com/news/1/a", "2024-01-01T00:00:00Z"),
            post("B", "https://cryptopanic.com/news/2/b", "2024-01-01T01:00:00Z"),
        ]
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/posts/"))
        .and(query_param("auth_token", "test-token"))
        .and(query_param("currencies", "BTC"))
        .and(query_param("kind", "news"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let headlines = client
        .list_latest("BTC", "news", 10)
        .await
        .expect("should list headlines");

    assert_eq!(headlines.len(), 2);
    assert_eq!(headlines[0].title, "A");
    assert_eq!(headlines[0].url, "https://cryptopanic.com/news/1/a");
    assert_eq!(headlines[0].source.title, "S1");
    assert_eq!(headlines[0].source.domain, "s1.com");
    assert_eq!(headlines[1].title, "B");
    assert_eq!(
        headlines[0].published_at.to_rfc3339(),
        "2024-01-01T00:00:00+00:00"
    );
}

#[tokio::test]
async fn list_latest_skips_invalid_items() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "results": [
            post("A", "https://cryptopanic.com/news/1/a", "2024-01-01T00:00:00Z"),
            { "title": "no url", "published_at": "2024-01-01T00:00:00Z" },
            post("C", "https://cryptopanic.com/news/3/c", "not a date"),
            post("D", "https://cryptopanic.com/news/4/d", "2024-01-02T00:00:00Z"),
        ]
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/posts/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let headlines = test_client(&server.uri())
        .list_latest("BTC", "news", 10)
        .await
        .expect("invalid items must not fail the call");

    let titles: Vec<&str> = headlines.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles, ["A", "D"]);
}

#[tokio::test]
async fn list_latest_truncates_to_limit() {
    let server = MockServer::start().await;

    let results: Vec<serde_json::Value> = (0..5)
        .map(|i| {
            post(
                &format!("T{i}"),
                &format!("https://cryptopanic.com/news/{i}/t"),
                "2024-01-01T00:00:00Z",
            )
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/api/v1/posts/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": results })),
        )
        .mount(&server)
        .await;

    let headlines = test_client(&server.uri())
        .list_latest("BTC", "news", 2)
        .await
        .unwrap();
    assert_eq!(headlines.len(), 2);
    assert_eq!(headlines[1].title, "T1");
}

#[tokio::test]
async fn non_success_status_is_upstream_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/posts/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .list_latest("BTC", "news", 10)
        .await
        .unwrap_err();

    assert!(
        matches!(err, FeedError::UpstreamUnavailable { status: 503, .. }),
        "unexpected error: {err:?}"
    );
    assert!(!err.to_string().contains("test-token"));
}

#[tokio::test]
async fn malformed_envelope_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/posts/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .list_latest("BTC", "news", 10)
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::Deserialize { .. }));
}
