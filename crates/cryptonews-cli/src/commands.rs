//! Command handlers. Results go to stdout as JSON; logs go to stderr.

use std::sync::Arc;

use anyhow::Context;
use cryptonews_analysis::AnalysisClient;
use cryptonews_core::AppConfig;
use cryptonews_db::{PoolConfig, SqlitePool};
use cryptonews_feed::CryptoPanicClient;
use cryptonews_ingest::{CancelToken, FeedQuery, Pipeline};
use cryptonews_render::ChromeRenderer;

async fn connect(config: &AppConfig) -> anyhow::Result<SqlitePool> {
    let pool = cryptonews_db::connect_pool(&config.database_url, PoolConfig::from_app_config(config))
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    cryptonews_db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    Ok(pool)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) async fn run_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = cryptonews_db::connect_pool(&config.database_url, PoolConfig::from_app_config(config))
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    let applied = cryptonews_db::run_migrations(&pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

pub(crate) async fn run_ingest(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let feed = CryptoPanicClient::with_base_url(
        &config.cryptopanic_auth_token,
        config.http_timeout_secs,
        &config.user_agent,
        &config.feed.base_url,
    )?;
    let renderer = ChromeRenderer::new(config.render.clone(), &config.user_agent)?;
    let pipeline = Pipeline::new(
        Arc::new(feed),
        Arc::new(renderer),
        Arc::new(pool),
        FeedQuery::from(&config.feed),
    );

    let report = pipeline.run(&CancelToken::new()).await?;
    print_json(&report)
}

pub(crate) async fn run_news(config: &AppConfig, page: u32, limit: u32) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let rows = cryptonews_db::list_news_page(&pool, page, limit).await?;
    print_json(&rows)
}

pub(crate) async fn run_fetch(config: &AppConfig, url: &str) -> anyhow::Result<()> {
    let renderer = ChromeRenderer::new(config.render.clone(), &config.user_agent)?;
    let extraction = renderer.render_once(url).await?;
    print_json(&extraction)
}

pub(crate) async fn run_analyze(config: &AppConfig, prompt: &str) -> anyhow::Result<()> {
    anyhow::ensure!(!prompt.trim().is_empty(), "prompt must not be empty");
    let client = AnalysisClient::with_base_url(
        &config.openai_api_key,
        &config.openai_model,
        config.http_timeout_secs,
        &config.openai_base_url,
    )?;
    let analysis = client.analyze(prompt).await?;
    println!("{analysis}");
    Ok(())
}
