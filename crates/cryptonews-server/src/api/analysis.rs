use axum::{extract::State, Extension, Json};
use cryptonews_analysis::{AnalysisError, ChatMessage};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct AnalyzeRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub(super) struct AnalyzeResponse {
    pub analysis: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ChatResponse {
    pub response: String,
}

/// Provider details stay in the log; clients only see a generic message.
fn map_analysis_error(request_id: String, error: &AnalysisError) -> ApiError {
    tracing::error!(error = %error, "analysis request failed");
    ApiError::new(request_id, "analysis_failed", "failed to generate analysis")
}

pub(super) async fn analyze(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    if body.prompt.trim().is_empty() {
        return Err(ApiError::new(req_id.0, "bad_request", "prompt must not be empty"));
    }

    let analysis = state
        .analysis
        .analyze(&body.prompt)
        .await
        .map_err(|e| map_analysis_error(req_id.0.clone(), &e))?;

    Ok(Json(AnalyzeResponse { analysis }))
}

pub(super) async fn chat(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if body.messages.iter().all(|m| m.content.trim().is_empty()) {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "messages must contain at least one non-empty message",
        ));
    }

    let response = state
        .analysis
        .chat(&body.messages, &body.context)
        .await
        .map_err(|e| map_analysis_error(req_id.0.clone(), &e))?;

    Ok(Json(ChatResponse { response }))
}
