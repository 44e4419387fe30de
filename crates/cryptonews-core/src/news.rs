//! Records that cross component boundaries during ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attribution for the publisher behind a headline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub title: String,
    pub domain: String,
}

/// A headline as listed by the news feed. Not persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadlineRecord {
    pub title: String,
    /// Feed-side link to the article; the natural key for stored rows.
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub source: SourceAttribution,
}

/// Fields read from a rendered article page.
///
/// Both fields are best-effort: `content: None` means the body could not be
/// read and the article should be treated as not extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleExtraction {
    pub content: Option<String>,
    pub source_link: Option<String>,
}

impl ArticleExtraction {
    /// Returns the body text when it is present and not blank.
    #[must_use]
    pub fn content_text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
