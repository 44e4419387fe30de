mod app_config;
mod config;
pub mod news;

pub use app_config::{AppConfig, Environment, FeedSettings, RenderSettings};
pub use config::{load_app_config, load_app_config_from_env};
pub use news::{ArticleExtraction, HeadlineRecord, SourceAttribution};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
