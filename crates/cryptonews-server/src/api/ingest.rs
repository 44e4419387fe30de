use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use cryptonews_ingest::{IngestError, IngestReport};

use crate::middleware::RequestId;

use super::{ApiError, AppState};

/// Runs one ingestion pass and returns its report.
///
/// The run lives in its own task so a client that disconnects mid-run does
/// not abort it.
pub(super) async fn trigger_ingest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<IngestReport>, ApiError> {
    tracing::info!("api: manual ingestion run requested");
    let job = Arc::clone(&state.ingest);
    let outcome = tokio::spawn(async move { job.run().await })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "api: manual ingestion task failed");
            ApiError::new(req_id.0.clone(), "internal_error", "ingestion run failed")
        })?;

    match outcome {
        Ok(report) => Ok(Json(report)),
        Err(IngestError::AlreadyRunning) => Err(ApiError::new(
            req_id.0,
            "conflict",
            "an ingestion run is already in progress",
        )),
        Err(e @ IngestError::Feed(_)) => {
            tracing::error!(error = %e, "api: manual ingestion run failed");
            Err(ApiError::new(req_id.0, "upstream_error", "headline feed unavailable"))
        }
        Err(e) => {
            tracing::error!(error = %e, "api: manual ingestion run failed");
            Err(ApiError::new(req_id.0, "internal_error", "ingestion run failed"))
        }
    }
}
