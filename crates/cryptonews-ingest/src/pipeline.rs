use std::sync::Arc;

use cryptonews_core::{FeedSettings, HeadlineRecord};
use cryptonews_db::NewNewsRow;
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::error::IngestError;
use crate::ports::{ArticleRenderer, HeadlineSource, NewsStore, RenderSession};

/// Feed parameters for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub currencies: String,
    pub kind: String,
    pub limit: usize,
}

impl From<&FeedSettings> for FeedQuery {
    fn from(settings: &FeedSettings) -> Self {
        Self {
            currencies: settings.currencies.clone(),
            kind: settings.kind.clone(),
            limit: settings.limit,
        }
    }
}

/// Outcome counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Headlines returned by the feed.
    pub fetched: usize,
    pub inserted: usize,
    /// Rendered articles whose URL was already stored.
    pub duplicates: usize,
    /// Render failures, empty extractions and store write errors.
    pub failed: usize,
    pub cancelled: bool,
}

/// Drives one feed → render → store pass. Strictly sequential.
#[derive(Clone)]
pub struct Pipeline {
    source: Arc<dyn HeadlineSource>,
    renderer: Arc<dyn ArticleRenderer>,
    store: Arc<dyn NewsStore>,
    query: FeedQuery,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    #[must_use]
    pub fn new(
        source: Arc<dyn HeadlineSource>,
        renderer: Arc<dyn ArticleRenderer>,
        store: Arc<dyn NewsStore>,
        query: FeedQuery,
    ) -> Self {
        Self {
            source,
            renderer,
            store,
            query,
        }
    }

    /// Runs one pass.
    ///
    /// A single article failure never aborts the run. Cancellation is checked
    /// before each article; a cancelled run returns the partial report.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Feed`] if the headline list cannot be fetched.
    /// - [`IngestError::Render`] if the browser session cannot be opened.
    pub async fn run(&self, cancel: &CancelToken) -> Result<IngestReport, IngestError> {
        let headlines = self
            .source
            .list_latest(&self.query.currencies, &self.query.kind, self.query.limit)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "ingest: headline fetch failed"))?;

        let mut report = IngestReport {
            fetched: headlines.len(),
            ..IngestReport::default()
        };
        tracing::info!(fetched = report.fetched, "ingest: headlines fetched");

        if headlines.is_empty() {
            return Ok(report);
        }
        if cancel.is_cancelled() {
            report.cancelled = true;
            tracing::info!("ingest: cancelled before rendering");
            return Ok(report);
        }

        let mut session = self
            .renderer
            .open_session()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "ingest: render session failed to open"))?;

        for headline in &headlines {
            if cancel.is_cancelled() {
                report.cancelled = true;
                tracing::info!("ingest: cancelled between articles");
                break;
            }
            self.process(session.as_mut(), headline, &mut report).await;
        }

        session.close().await;

        tracing::info!(
            fetched = report.fetched,
            inserted = report.inserted,
            duplicates = report.duplicates,
            failed = report.failed,
            cancelled = report.cancelled,
            "ingest: run complete"
        );
        Ok(report)
    }

    async fn process(
        &self,
        session: &mut dyn RenderSession,
        headline: &HeadlineRecord,
        report: &mut IngestReport,
    ) {
        let extraction = match session.render(&headline.url).await {
            Ok(extraction) => extraction,
            Err(e) => {
                tracing::warn!(url = %headline.url, error = %e, "ingest: render failed, skipping");
                report.failed += 1;
                return;
            }
        };

        let Some(content) = extraction.content_text() else {
            tracing::warn!(url = %headline.url, "ingest: no article content extracted, skipping");
            report.failed += 1;
            return;
        };

        let row = NewNewsRow {
            title: &headline.title,
            content,
            published_at: headline.published_at,
            cryptopanic_url: &headline.url,
            source_link: extraction.source_link.as_deref(),
            source_title: &headline.source.title,
            source_domain: &headline.source.domain,
        };

        match self.store.insert_if_absent(&row).await {
            Ok(true) => {
                tracing::debug!(url = %headline.url, "ingest: stored article");
                report.inserted += 1;
            }
            Ok(false) => {
                tracing::debug!(url = %headline.url, "ingest: already stored");
                report.duplicates += 1;
            }
            Err(e) => {
                tracing::error!(url = %headline.url, error = %e, "ingest: store write failed");
                report.failed += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
