use cryptonews_feed::FeedError;
use cryptonews_render::RenderError;
use thiserror::Error;

/// Failures that abort a whole run. Per-article failures are counted in the
/// report instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("headline feed failed: {0}")]
    Feed(#[from] FeedError),

    #[error("could not open render session: {0}")]
    Render(#[from] RenderError),

    #[error("an ingestion run is already in progress")]
    AlreadyRunning,
}
