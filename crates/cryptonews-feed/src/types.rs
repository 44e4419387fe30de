//! Wire shapes for the upstream JSON APIs.
//!
//! Fields are optional here so a single malformed item can be rejected on its
//! own during validation instead of failing the whole response.

use serde::Deserialize;

/// Envelope of the CryptoPanic `posts` endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct PostsResponse {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPost {
    pub title: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub source: Option<RawSource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSource {
    pub title: Option<String>,
    pub domain: Option<String>,
}

/// Envelope of the OKX market endpoints: `{"code": "0", "msg": "", "data": [...]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct OkxResponse {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Vec<Vec<String>>,
}
