use thiserror::Error;

/// Errors returned by the upstream feed clients.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network or TLS failure. The request URL is stripped because it carries
    /// the feed access token.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("upstream unavailable: HTTP {status} from {endpoint}")]
    UpstreamUnavailable { status: u16, endpoint: &'static str },

    /// The upstream reported an application-level error in a 2xx body.
    #[error("upstream API error from {endpoint}: {message}")]
    ApiError {
        endpoint: &'static str,
        message: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
