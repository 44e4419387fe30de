mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use cryptonews_analysis::AnalysisClient;
use cryptonews_feed::{CryptoPanicClient, OkxCandleClient};
use cryptonews_ingest::{FeedQuery, IngestJob, Pipeline};
use cryptonews_render::ChromeRenderer;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    scheduler::IngestScheduler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(cryptonews_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting cryptonews-server");

    let pool_config = cryptonews_db::PoolConfig::from_app_config(&config);
    let pool = cryptonews_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = cryptonews_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations complete");

    let feed = CryptoPanicClient::with_base_url(
        &config.cryptopanic_auth_token,
        config.http_timeout_secs,
        &config.user_agent,
        &config.feed.base_url,
    )?;
    let renderer = Arc::new(ChromeRenderer::new(config.render.clone(), &config.user_agent)?);
    let pipeline = Pipeline::new(
        Arc::new(feed),
        renderer.clone(),
        Arc::new(pool.clone()),
        FeedQuery::from(&config.feed),
    );
    let ingest = Arc::new(IngestJob::new(pipeline));

    let analysis = AnalysisClient::with_base_url(
        &config.openai_api_key,
        &config.openai_model,
        config.http_timeout_secs,
        &config.openai_base_url,
    )?;
    let candles = OkxCandleClient::with_base_url(
        config.http_timeout_secs,
        &config.user_agent,
        &config.okx_base_url,
    )?;

    let scheduler = IngestScheduler::start(
        Arc::clone(&ingest),
        Duration::from_secs(config.ingest_interval_secs),
    )
    .await?;

    let app = build_app(AppState {
        pool,
        renderer,
        analysis: Arc::new(analysis),
        candles: Arc::new(candles),
        ingest,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
