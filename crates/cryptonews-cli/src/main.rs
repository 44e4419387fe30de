mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cryptonews-cli")]
#[command(about = "Crypto news ingestion command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Run one ingestion pass and print its report
    Ingest,
    /// List stored news, newest first
    News {
        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: u32,
        /// Rows per page
        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// Render a single article and print the extraction
    Fetch {
        /// Article URL
        url: String,
    },
    /// Ask the language model for a market analysis
    Analyze {
        /// Prompt text
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = cryptonews_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Migrate => commands::run_migrate(&config).await,
        Commands::Ingest => commands::run_ingest(&config).await,
        Commands::News { page, limit } => commands::run_news(&config, page, limit).await,
        Commands::Fetch { url } => commands::run_fetch(&config, &url).await,
        Commands::Analyze { prompt } => commands::run_analyze(&config, &prompt).await,
    }
}
