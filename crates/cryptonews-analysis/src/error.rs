use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The completion endpoint answered with a non-success status. No retry.
    #[error("language model unavailable: HTTP {status}")]
    ModelUnavailable { status: u16 },

    #[error("unexpected completion response: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("completion returned no text")]
    EmptyCompletion,

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
