use crate::app_config::{AppConfig, Environment, FeedSettings, RenderSettings};
use crate::ConfigError;

const MIN_MARKER_TIMEOUT_SECS: u64 = 5;
const MAX_MARKER_TIMEOUT_SECS: u64 = 10;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it from a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let cryptopanic_auth_token = require("CRYPTOPANIC_AUTH_TOKEN")?;
    let openai_api_key = require("OPENAI_API_KEY")?;

    let database_url = or_default("DATABASE_URL", "sqlite://cryptonews.db");
    let env = parse_environment(&or_default("CRYPTONEWS_ENV", "development"))?;
    let bind_addr = or_default("CRYPTONEWS_BIND_ADDR", "0.0.0.0:3001")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("CRYPTONEWS_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("CRYPTONEWS_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("CRYPTONEWS_DB_MAX_CONNECTIONS", "5")?;
    if db_max_connections == 0 {
        return Err(invalid(
            "CRYPTONEWS_DB_MAX_CONNECTIONS",
            "must be at least 1".to_string(),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("CRYPTONEWS_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let http_timeout_secs = parse_u64("CRYPTONEWS_HTTP_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("CRYPTONEWS_USER_AGENT", "cryptonews/0.1 (news-ingest)");

    let feed_limit = parse_usize("CRYPTONEWS_FEED_LIMIT", "10")?;
    if feed_limit == 0 {
        return Err(invalid(
            "CRYPTONEWS_FEED_LIMIT",
            "must be at least 1".to_string(),
        ));
    }
    let feed = FeedSettings {
        base_url: or_default("CRYPTOPANIC_BASE_URL", "https://cryptopanic.com"),
        currencies: or_default("CRYPTONEWS_FEED_CURRENCIES", "BTC"),
        kind: or_default("CRYPTONEWS_FEED_KIND", "news"),
        limit: feed_limit,
    };

    let marker_timeout_secs = parse_u64("CRYPTONEWS_RENDER_MARKER_TIMEOUT_SECS", "5")?;
    if !(MIN_MARKER_TIMEOUT_SECS..=MAX_MARKER_TIMEOUT_SECS).contains(&marker_timeout_secs) {
        return Err(invalid(
            "CRYPTONEWS_RENDER_MARKER_TIMEOUT_SECS",
            format!(
                "must be between {MIN_MARKER_TIMEOUT_SECS} and {MAX_MARKER_TIMEOUT_SECS} seconds"
            ),
        ));
    }
    let render = RenderSettings {
        navigation_timeout_secs: parse_u64("CRYPTONEWS_RENDER_NAV_TIMEOUT_SECS", "30")?,
        marker_timeout_secs,
        content_selector: or_default("CRYPTONEWS_RENDER_CONTENT_SELECTOR", ".description-body"),
        source_link_selector: or_default("CRYPTONEWS_RENDER_LINK_SELECTOR", ".post-title a"),
        chrome_path: lookup("CRYPTONEWS_CHROME_PATH").ok().map(PathBuf::from),
    };

    let ingest_interval_secs = parse_u64("CRYPTONEWS_INGEST_INTERVAL_SECS", "3600")?;
    if ingest_interval_secs == 0 {
        return Err(invalid(
            "CRYPTONEWS_INGEST_INTERVAL_SECS",
            "must be at least 1".to_string(),
        ));
    }

    let openai_base_url = or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");
    let openai_model = or_default("OPENAI_MODEL", "gpt-4o-mini");
    let okx_base_url = or_default("OKX_BASE_URL", "https://www.okx.com");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_acquire_timeout_secs,
        http_timeout_secs,
        user_agent,
        cryptopanic_auth_token,
        feed,
        render,
        ingest_interval_secs,
        openai_api_key,
        openai_base_url,
        openai_model,
        okx_base_url,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CRYPTONEWS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
