//! Seams between the pipeline and its collaborators, so runs can be driven
//! by in-memory fakes.

use async_trait::async_trait;
use cryptonews_core::{ArticleExtraction, HeadlineRecord};
use cryptonews_db::{DbError, NewNewsRow};
use cryptonews_feed::FeedError;
use cryptonews_render::RenderError;

#[async_trait]
pub trait HeadlineSource: Send + Sync {
    async fn list_latest(
        &self,
        currencies: &str,
        kind: &str,
        limit: usize,
    ) -> Result<Vec<HeadlineRecord>, FeedError>;
}

#[async_trait]
pub trait ArticleRenderer: Send + Sync {
    /// Opens the session used for every article of one run.
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError>;
}

/// An exclusively-owned browser session. Implementations must also release
/// their resources on drop.
#[async_trait]
pub trait RenderSession: Send {
    async fn render(&mut self, url: &str) -> Result<ArticleExtraction, RenderError>;

    async fn close(&mut self);
}

#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Returns `true` when a row was written, `false` when the URL already existed.
    async fn insert_if_absent(&self, row: &NewNewsRow<'_>) -> Result<bool, DbError>;
}
