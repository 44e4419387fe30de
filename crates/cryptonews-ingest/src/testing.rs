//! In-memory collaborators for pipeline and job tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use cryptonews_core::{ArticleExtraction, HeadlineRecord, SourceAttribution};
use cryptonews_db::{DbError, NewNewsRow};
use cryptonews_feed::FeedError;
use cryptonews_render::RenderError;
use tokio::sync::Notify;

use crate::cancel::CancelToken;
use crate::pipeline::{FeedQuery, Pipeline};
use crate::ports::{ArticleRenderer, HeadlineSource, NewsStore, RenderSession};

pub(crate) fn headline(title: &str, url: &str) -> HeadlineRecord {
    HeadlineRecord {
        title: title.to_string(),
        url: url.to_string(),
        published_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        source: SourceAttribution {
            title: "S1".to_string(),
            domain: "s1.com".to_string(),
        },
    }
}

pub(crate) fn extraction(content: &str, link: &str) -> ArticleExtraction {
    ArticleExtraction {
        content: Some(content.to_string()),
        source_link: Some(link.to_string()),
    }
}

pub(crate) fn query() -> FeedQuery {
    FeedQuery {
        currencies: "BTC".to_string(),
        kind: "news".to_string(),
        limit: 10,
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub(crate) struct FakeSource {
    headlines: Vec<HeadlineRecord>,
    fail_status: Option<u16>,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn with(headlines: Vec<HeadlineRecord>) -> Self {
        Self {
            headlines,
            fail_status: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            headlines: Vec::new(),
            fail_status: Some(status),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl HeadlineSource for FakeSource {
    async fn list_latest(
        &self,
        _currencies: &str,
        _kind: &str,
        limit: usize,
    ) -> Result<Vec<HeadlineRecord>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.fail_status {
            return Err(FeedError::UpstreamUnavailable {
                status,
                endpoint: "fake",
            });
        }
        Ok(self.headlines.iter().take(limit).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Serves extractions by URL; unknown URLs time out.
#[derive(Default)]
pub(crate) struct FakeRenderer {
    pages: HashMap<String, ArticleExtraction>,
    fail_launch: bool,
    cancel_after: Option<(usize, CancelToken)>,
    gate: Option<Arc<Notify>>,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub rendered: Arc<Mutex<Vec<String>>>,
}

impl FakeRenderer {
    pub fn with_pages(pages: &[(&str, ArticleExtraction)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, ex)| ((*url).to_string(), ex.clone()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing_launch() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    /// Cancels `token` once `count` articles have been rendered.
    pub fn cancel_after(mut self, count: usize, token: CancelToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    /// Blocks every render until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

struct FakeSession {
    pages: HashMap<String, ArticleExtraction>,
    cancel_after: Option<(usize, CancelToken)>,
    gate: Option<Arc<Notify>>,
    closed: Arc<AtomicUsize>,
    rendered: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ArticleRenderer for FakeRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        if self.fail_launch {
            return Err(RenderError::Launch {
                reason: "no chrome".to_string(),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            pages: self.pages.clone(),
            cancel_after: self.cancel_after.clone(),
            gate: self.gate.clone(),
            closed: Arc::clone(&self.closed),
            rendered: Arc::clone(&self.rendered),
        }))
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn render(&mut self, url: &str) -> Result<ArticleExtraction, RenderError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let count = {
            let mut rendered = self.rendered.lock().unwrap();
            rendered.push(url.to_string());
            rendered.len()
        };
        if let Some((after, token)) = &self.cancel_after {
            if count >= *after {
                token.cancel();
            }
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| RenderError::Timeout {
                url: url.to_string(),
                waited_secs: 5,
            })
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct MemoryStore {
    pub rows: Mutex<Vec<(String, String)>>,
    fail_urls: HashSet<String>,
}

impl MemoryStore {
    pub fn failing_on(urls: &[&str]) -> Self {
        Self {
            rows: Mutex::default(),
            fail_urls: urls.iter().map(|u| (*u).to_string()).collect(),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl NewsStore for MemoryStore {
    async fn insert_if_absent(&self, row: &NewNewsRow<'_>) -> Result<bool, DbError> {
        if self.fail_urls.contains(row.cryptopanic_url) {
            return Err(DbError::NotFound);
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|(url, _)| url == row.cryptopanic_url) {
            return Ok(false);
        }
        rows.push((row.cryptopanic_url.to_string(), row.content.to_string()));
        Ok(true)
    }
}

pub(crate) fn pipeline(
    source: Arc<FakeSource>,
    renderer: Arc<FakeRenderer>,
    store: Arc<dyn NewsStore>,
) -> Pipeline {
    Pipeline::new(source, renderer, store, query())
}
