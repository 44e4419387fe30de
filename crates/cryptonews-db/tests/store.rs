//! Store tests against a migrated in-memory `SQLite` database.

use chrono::{DateTime, Duration, TimeZone, Utc};
use cryptonews_db::{
    connect_in_memory, count_news, get_news_by_url, insert_news_if_absent, list_news_page,
    run_migrations, DbError, NewNewsRow, SqlitePool,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn migrated_pool() -> SqlitePool {
    let pool = connect_in_memory().await.expect("in-memory pool");
    run_migrations(&pool).await.expect("migrations");
    pool
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn candidate<'a>(url: &'a str, content: &'a str, published_at: DateTime<Utc>) -> NewNewsRow<'a> {
    NewNewsRow {
        title: "Headline",
        content,
        published_at,
        cryptopanic_url: url,
        source_link: Some("https://publisher.example/a"),
        source_title: "Publisher",
        source_domain: "publisher.example",
    }
}

// ---------------------------------------------------------------------------
// insert_news_if_absent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn insert_stores_scenario_row() {
    let pool = migrated_pool().await;
    let row = NewNewsRow {
        title: "A",
        content: "body text",
        published_at: base_time(),
        cryptopanic_url: "u1",
        source_link: Some("https://s1.com/a"),
        source_title: "S1",
        source_domain: "s1.com",
    };

    let inserted = insert_news_if_absent(&pool, &row).await.expect("insert");
    assert!(inserted);

    let stored = get_news_by_url(&pool, "u1").await.expect("row");
    assert_eq!(stored.title, "A");
    assert_eq!(stored.content, "body text");
    assert_eq!(stored.published_at, base_time());
    assert_eq!(stored.source_link.as_deref(), Some("https://s1.com/a"));
    assert_eq!(stored.source_title, "S1");
    assert_eq!(stored.source_domain, "s1.com");
    assert!(stored.id > 0);
    assert_eq!(count_news(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn duplicate_url_is_a_silent_noop_keeping_first_content() {
    let pool = migrated_pool().await;

    let first = insert_news_if_absent(&pool, &candidate("dup", "first body", base_time()))
        .await
        .expect("first insert");
    let second = insert_news_if_absent(&pool, &candidate("dup", "second body", base_time()))
        .await
        .expect("second insert should not error");

    assert!(first);
    assert!(!second);
    assert_eq!(count_news(&pool).await.unwrap(), 1);
    let stored = get_news_by_url(&pool, "dup").await.unwrap();
    assert_eq!(stored.content, "first body");
}

#[tokio::test]
async fn ids_increase_with_insert_order() {
    let pool = migrated_pool().await;
    insert_news_if_absent(&pool, &candidate("a", "x", base_time()))
        .await
        .unwrap();
    insert_news_if_absent(&pool, &candidate("b", "x", base_time()))
        .await
        .unwrap();

    let a = get_news_by_url(&pool, "a").await.unwrap();
    let b = get_news_by_url(&pool, "b").await.unwrap();
    assert!(b.id > a.id);
}

#[tokio::test]
async fn source_link_may_be_absent() {
    let pool = migrated_pool().await;
    let mut row = candidate("no-link", "body", base_time());
    row.source_link = None;
    insert_news_if_absent(&pool, &row).await.unwrap();

    let stored = get_news_by_url(&pool, "no-link").await.unwrap();
    assert!(stored.source_link.is_none());
}

#[tokio::test]
async fn get_news_by_url_returns_not_found() {
    let pool = migrated_pool().await;
    let err = get_news_by_url(&pool, "missing").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// list_news_page
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_store_returns_empty_first_page() {
    let pool = migrated_pool().await;
    let page = list_news_page(&pool, 1, 5).await.expect("page");
    assert!(page.is_empty());
}

#[tokio::test]
async fn zero_page_or_size_is_rejected() {
    let pool = migrated_pool().await;
    assert!(matches!(
        list_news_page(&pool, 0, 5).await,
        Err(DbError::InvalidPagination { page: 0, .. })
    ));
    assert!(matches!(
        list_news_page(&pool, 1, 0).await,
        Err(DbError::InvalidPagination { page_size: 0, .. })
    ));
}

#[tokio::test]
async fn pages_concatenate_to_full_descending_order() {
    let pool = migrated_pool().await;

    // Insert out of chronological order, with one timestamp tie.
    let offsets = [3_i64, 0, 6, 1, 4, 4, 2];
    for (i, hours) in offsets.iter().enumerate() {
        let url = format!("url-{i}");
        insert_news_if_absent(
            &pool,
            &candidate(&url, "body", base_time() + Duration::hours(*hours)),
        )
        .await
        .unwrap();
    }

    let total = offsets.len();
    let limit: u32 = 3;
    let pages = u32::try_from(total.div_ceil(limit as usize)).unwrap();

    let mut collected = Vec::new();
    for page in 1..=pages {
        let rows = list_news_page(&pool, page, limit).await.unwrap();
        assert!(!rows.is_empty(), "page {page} should not be empty");
        collected.extend(rows);
    }

    let past_end = list_news_page(&pool, pages + 1, limit).await.unwrap();
    assert!(past_end.is_empty(), "page past the end must be empty");

    assert_eq!(collected.len(), total, "no gaps or repeats");
    let mut urls: Vec<&str> = collected.iter().map(|r| r.cryptopanic_url.as_str()).collect();
    urls.sort_unstable();
    urls.dedup();
    assert_eq!(urls.len(), total);

    for pair in collected.windows(2) {
        assert!(
            pair[0].published_at > pair[1].published_at
                || (pair[0].published_at == pair[1].published_at && pair[0].id > pair[1].id),
            "rows out of order: {:?} then {:?}",
            pair[0].cryptopanic_url,
            pair[1].cryptopanic_url
        );
    }
    assert_eq!(collected[0].cryptopanic_url, "url-2");
}
