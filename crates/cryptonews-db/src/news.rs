//! Database operations for the `news` table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::DbError;

/// A row from the `news` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct NewsRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub cryptopanic_url: String,
    pub source_link: Option<String>,
    pub source_title: String,
    pub source_domain: String,
    pub created_at: DateTime<Utc>,
}

/// Insert candidate for the `news` table. `id` and `created_at` are assigned
/// by the database.
#[derive(Debug, Clone)]
pub struct NewNewsRow<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub published_at: DateTime<Utc>,
    pub cryptopanic_url: &'a str,
    pub source_link: Option<&'a str>,
    pub source_title: &'a str,
    pub source_domain: &'a str,
}

/// Inserts a row unless one with the same `cryptopanic_url` already exists.
///
/// Returns `true` when a row was written. A duplicate URL is a no-op that
/// returns `false`; the existing row is never updated. The uniqueness check
/// happens inside the single `INSERT`, so concurrent writers cannot create a
/// duplicate.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_news_if_absent(pool: &SqlitePool, row: &NewNewsRow<'_>) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO news \
             (title, content, published_at, cryptopanic_url, source_link, source_title, source_domain) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT (cryptopanic_url) DO NOTHING",
    )
    .bind(row.title)
    .bind(row.content)
    .bind(row.published_at)
    .bind(row.cryptopanic_url)
    .bind(row.source_link)
    .bind(row.source_title)
    .bind(row.source_domain)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Returns one page of rows, newest `published_at` first.
///
/// Pages are 1-based. Rows with equal `published_at` are ordered by `id DESC`
/// so consecutive pages never overlap. A page past the end is empty.
///
/// # Errors
///
/// Returns [`DbError::InvalidPagination`] if `page` or `page_size` is zero,
/// or [`DbError::Sqlx`] if the query fails.
pub async fn list_news_page(
    pool: &SqlitePool,
    page: u32,
    page_size: u32,
) -> Result<Vec<NewsRow>, DbError> {
    if page == 0 || page_size == 0 {
        return Err(DbError::InvalidPagination { page, page_size });
    }
    let offset = i64::from(page - 1)
        .checked_mul(i64::from(page_size))
        .ok_or(DbError::InvalidPagination { page, page_size })?;

    let rows = sqlx::query_as::<_, NewsRow>(
        "SELECT id, title, content, published_at, cryptopanic_url, source_link, \
                source_title, source_domain, created_at \
         FROM news \
         ORDER BY published_at DESC, id DESC \
         LIMIT ? OFFSET ?",
    )
    .bind(i64::from(page_size))
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches the row stored for a feed URL.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has that URL, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_news_by_url(pool: &SqlitePool, cryptopanic_url: &str) -> Result<NewsRow, DbError> {
    sqlx::query_as::<_, NewsRow>(
        "SELECT id, title, content, published_at, cryptopanic_url, source_link, \
                source_title, source_domain, created_at \
         FROM news \
         WHERE cryptopanic_url = ?",
    )
    .bind(cryptopanic_url)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Total number of stored rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_news(pool: &SqlitePool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM news")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
