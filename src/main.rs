mod browser;
mod config;
mod database;
mod extract;
mod http_client;
mod models;
mod probe;
mod scrapers;

use anyhow::Result;
use browser::{BrowserSession, WebDriverSession};
use clap::Parser;
use config::Config;
use database::Database;
use scrapers::AutoRiaScraper;

#[derive(Parser, Debug)]
#[command(name = "ria_cars")]
#[command(about = "Scrapes auto.ria.com used-car listings into a local database", long_about = None)]
struct Args {
    /// WebDriver endpoint, overrides WEBDRIVER_URL
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Database name, overrides DB_NAME
    #[arg(long)]
    database: Option<String>,

    /// Fetch the first index page over HTTP and report what the scraper would see
    #[arg(long)]
    probe: bool,

    /// Save HTML to file when using --probe
    #[arg(long, requires = "probe")]
    save_html: Option<String>,

    /// Write a default data/config.yaml and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if args.init_config {
        Config::create_default()?;
        eprintln!("Default configuration written to data/config.yaml");
        return Ok(());
    }

    let mut config = Config::load()?;
    if let Some(url) = args.webdriver_url {
        config.webdriver_url = url;
    }
    if let Some(name) = args.database {
        config.db_name = name;
    }

    init_tracing(&config);

    if args.probe {
        probe::probe_index(&config, args.save_html.as_deref()).await?;
        return Ok(());
    }

    tracing::info!("Started parsing ...");

    tracing::info!("Creating missing tables ...");
    let db = Database::open(&config)?;

    tracing::info!("Initializing driver ...");
    let session = WebDriverSession::connect(&config).await?;

    let result = AutoRiaScraper::new(&session, &db, &config).run().await;

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close the browser session: {}", e);
    }

    let summary = result?;
    tracing::info!(
        "Visited {} pages, stored {} listings ({} new, {} updated), {} in {}",
        summary.pages_visited,
        summary.listings_saved(),
        summary.listings_inserted,
        summary.listings_updated,
        db.count_listings()?,
        db.path().display()
    );

    tracing::info!("Finished parsing ...");
    Ok(())
}

/// Use the RUST_LOG env var if set, otherwise the configured level
fn init_tracing(config: &Config) {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
        tracing::info!("Logging level set from RUST_LOG environment variable");
    } else {
        let level = config.tracing_level.to_lowercase();
        let max_level = match level.as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => {
                eprintln!("Invalid tracing level '{}', using 'info'", level);
                tracing::Level::INFO
            }
        };

        tracing_subscriber::fmt()
            .with_max_level(max_level)
            .init();

        tracing::debug!("Logging level set to: {}", level);
    }
}
