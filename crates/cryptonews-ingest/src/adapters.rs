use async_trait::async_trait;
use cryptonews_core::{ArticleExtraction, HeadlineRecord};
use cryptonews_db::{DbError, NewNewsRow, SqlitePool};
use cryptonews_feed::{CryptoPanicClient, FeedError};
use cryptonews_render::{ChromeRenderer, ChromeSession, RenderError};

use crate::ports::{ArticleRenderer, HeadlineSource, NewsStore, RenderSession};

#[async_trait]
impl HeadlineSource for CryptoPanicClient {
    async fn list_latest(
        &self,
        currencies: &str,
        kind: &str,
        limit: usize,
    ) -> Result<Vec<HeadlineRecord>, FeedError> {
        CryptoPanicClient::list_latest(self, currencies, kind, limit).await
    }
}

#[async_trait]
impl ArticleRenderer for ChromeRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let session = ChromeRenderer::open_session(self).await?;
        Ok(Box::new(session))
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn render(&mut self, url: &str) -> Result<ArticleExtraction, RenderError> {
        ChromeSession::render(self, url).await
    }

    async fn close(&mut self) {
        ChromeSession::close(self).await;
    }
}

#[async_trait]
impl NewsStore for SqlitePool {
    async fn insert_if_absent(&self, row: &NewNewsRow<'_>) -> Result<bool, DbError> {
        cryptonews_db::insert_news_if_absent(self, row).await
    }
}
