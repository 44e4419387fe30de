use axum::{
    extract::{Query, State},
    Extension, Json,
};
use cryptonews_db::NewsRow;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, AppState};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
pub(super) struct LatestNewsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Resolves `(page, page_size)`: page defaults to 1, size to 10, clamped to 1..=100.
pub(super) fn normalize_pagination(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

pub(super) async fn latest_news(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LatestNewsQuery>,
) -> Result<Json<Vec<NewsRow>>, ApiError> {
    let (page, limit) = normalize_pagination(query.page, query.limit);
    let rows = cryptonews_db::list_news_page(&state.pool, page, limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub(super) struct FetchContentRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FetchContentResponse {
    pub content: String,
    pub source_link: Option<String>,
}

/// Renders one article on demand in its own browser session.
pub(super) async fn fetch_content(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<FetchContentRequest>,
) -> Result<Json<FetchContentResponse>, ApiError> {
    let Some(url) = body
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| is_http_url(u))
    else {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "url must be an absolute http(s) URL",
        ));
    };

    let mut session = state.renderer.open_session().await.map_err(|e| {
        tracing::error!(error = %e, "fetch-content: render session failed to open");
        ApiError::new(req_id.0.clone(), "render_failed", "failed to fetch content")
    })?;
    let rendered = session.render(url).await;
    session.close().await;

    let extraction = rendered.map_err(|e| {
        tracing::warn!(url, error = %e, "fetch-content: render failed");
        ApiError::new(req_id.0.clone(), "render_failed", "failed to fetch content")
    })?;

    let Some(content) = extraction.content_text() else {
        return Err(ApiError::new(req_id.0, "not_found", "content not found"));
    };

    Ok(Json(FetchContentResponse {
        content: content.to_string(),
        source_link: extraction.source_link.clone(),
    }))
}

fn is_http_url(candidate: &str) -> bool {
    candidate
        .strip_prefix("https://")
        .or_else(|| candidate.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty() && !rest.starts_with('/'))
}
