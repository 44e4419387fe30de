use axum::{
    extract::{Query, State},
    Extension, Json,
};
use cryptonews_feed::{Candle, FeedError};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

const DEFAULT_INST_ID: &str = "BTC-USDT";
const DEFAULT_BAR: &str = "1H";
const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 300;

#[derive(Debug, Deserialize)]
pub(super) struct CandlesQuery {
    pub inst_id: Option<String>,
    pub bar: Option<String>,
    pub limit: Option<u32>,
}

pub(super) async fn list_candles(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CandlesQuery>,
) -> Result<Json<Vec<Candle>>, ApiError> {
    let inst_id = query.inst_id.as_deref().unwrap_or(DEFAULT_INST_ID);
    let bar = query.bar.as_deref().unwrap_or(DEFAULT_BAR);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let candles = state
        .candles
        .fetch_candles(inst_id, bar, limit)
        .await
        .map_err(|e| map_feed_error(req_id.0.clone(), &e))?;

    Ok(Json(candles))
}

fn map_feed_error(request_id: String, error: &FeedError) -> ApiError {
    tracing::error!(error = %error, "candles: upstream request failed");
    match error {
        FeedError::ApiError { message, .. } => {
            ApiError::new(request_id, "bad_request", message.clone())
        }
        _ => ApiError::new(request_id, "upstream_error", "market data unavailable"),
    }
}
