use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Parameters for the headline feed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    pub base_url: String,
    pub currencies: String,
    pub kind: String,
    pub limit: usize,
}

/// Browser and extraction settings for the article renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub navigation_timeout_secs: u64,
    /// Bounded wait for the content marker. Validated to 5–10 seconds.
    pub marker_timeout_secs: u64,
    pub content_selector: String,
    pub source_link_selector: String,
    pub chrome_path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub cryptopanic_auth_token: String,
    pub feed: FeedSettings,
    pub render: RenderSettings,
    pub ingest_interval_secs: u64,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub okx_base_url: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url)
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("cryptopanic_auth_token", &"[redacted]")
            .field("feed", &self.feed)
            .field("render", &self.render)
            .field("ingest_interval_secs", &self.ingest_interval_secs)
            .field("openai_api_key", &"[redacted]")
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("okx_base_url", &self.okx_base_url)
            .finish()
    }
}
