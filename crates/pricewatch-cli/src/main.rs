mod check;
mod commands;
mod sinks;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricewatch")]
#[command(about = "Competitor price monitor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check due watchlist products and push changed prices
    Check {
        /// Products per run; defaults to PRICEWATCH_PRICE_CHECK_BATCH_SIZE
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Fetch one product page and print its snapshot as JSON
    Fetch {
        #[arg(long)]
        site: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        variant: Option<String>,
    },
    /// Fetch a category listing and print the snapshots as JSON
    Category {
        #[arg(long)]
        site: String,
        #[arg(long)]
        url: String,
    },
    /// Extract a price from a saved HTML file without touching the network
    Extract {
        #[arg(long)]
        site: String,
        #[arg(long)]
        file: PathBuf,
        /// URL the page was saved from; used to resolve relative links
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        variant: Option<String>,
        /// Captured network response bodies (JSON) to scan as a fallback
        #[arg(long = "network")]
        network: Vec<PathBuf>,
    },
    /// Compute target prices for a watchlist product at a given competitor price
    Price {
        /// Product name as written in the watchlist
        #[arg(long)]
        product: String,
        #[arg(long)]
        price: Decimal,
    },
    /// Load and validate the watchlist
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = pricewatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check { batch_size } => commands::run_check(&config, batch_size).await,
        Commands::Fetch { site, url, variant } => {
            commands::run_fetch(&config, &site, &url, variant.as_deref()).await
        }
        Commands::Category { site, url } => commands::run_category(&config, &site, &url).await,
        Commands::Extract {
            site,
            file,
            url,
            variant,
            network,
        } => commands::run_extract(&config, &site, &file, url, variant.as_deref(), &network).await,
        Commands::Price { product, price } => commands::run_price(&config, &product, price),
        Commands::Validate => commands::run_validate(&config),
    }
}
