//! Feedboard - quotes, weather and news in the terminal
//!
//! A CLI that fetches live data from a quote service, WeatherAPI.com and a
//! Strapi CMS, fans independent requests out concurrently, and renders the
//! result as Markdown or JSON. Failed requests become placeholders.
//!
//! Exit codes:
//!   0 - Success (or no --fail-on threshold crossed)
//!   1 - Runtime error (configuration, unreachable service, etc.)
//!   2 - Requests fell back to placeholders and --fail-on was met

mod aggregate;
mod cli;
mod config;
mod http;
mod models;
mod progress;
mod report;
mod sources;

use anyhow::{anyhow, Context, Result};
use cli::{Args, Command, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use models::PostView;
use progress::ProgressObserver;
use sources::{quotes, NewsClient, QuoteClient, WeatherClient};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Rendered output plus how many of its requests fell back.
struct Rendered {
    content: String,
    failed: usize,
    total: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if args.command == Command::InitConfig {
        return handle_init_config();
    }

    let (config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    info!("Feedboard v{}", env!("CARGO_PKG_VERSION"));
    match config_source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .feedboard.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set API keys, cities, icons, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from an explicit path, the default file, or defaults.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, Some(config_path.clone())));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, Some(PathBuf::from(CONFIG_FILE_NAME)))),
        Ok(None) => Ok((Config::default(), None)),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", CONFIG_FILE_NAME, e);
            Ok((Config::default(), None))
        }
    }
}

/// Run one subcommand. Returns the exit code (0 or 2).
async fn run(args: Args, mut config: Config) -> Result<i32> {
    config.merge_with_args(&args);
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    let rendered = match args.command {
        Command::Weather { .. } => run_weather(&args, &config).await?,
        Command::Quotes {
            index,
            count,
            reverse,
        } => run_quotes(&args, &config, index, count, reverse).await?,
        Command::News { page, ref search } => {
            run_news(&args, &config, page, search.as_deref()).await?
        }
        Command::Post { ref references } => run_posts(&args, &config, references).await?,
        Command::InitConfig => return Ok(0),
    };

    match args.output {
        Some(ref path) => {
            report::write_output(&rendered.content, path)?;
            eprintln!("✅ Output saved to: {}", path.display());
        }
        None => print!("{}", rendered.content),
    }

    // Check --fail-on threshold
    if let Some(fail_on) = args.fail_on {
        if fail_on.is_met(rendered.failed, rendered.total) {
            eprintln!(
                "\n⛔ {} of {} requests fell back to placeholders. Failing (exit code 2).",
                rendered.failed, rendered.total
            );
            return Ok(2);
        }
    }

    Ok(0)
}

async fn run_weather(args: &Args, config: &Config) -> Result<Rendered> {
    let settings = &config.weather;
    if settings.api_key.trim().is_empty() {
        warn!("No WeatherAPI key configured; set FEEDBOARD_WEATHER_KEY or weather.api_key");
    }

    let client = WeatherClient::new(settings, config.general.timeout_seconds)?;
    let observer = ProgressObserver::new(settings.cities.len(), "Weather", args.quiet);
    let dashboard = client.dashboard(&settings.cities, &observer).await?;
    observer.finish();

    let total = dashboard.reports.len();
    let failed = dashboard.failed.len();
    if failed == total {
        eprintln!("⚠️  Unable to load weather data for any city. Please try again later.");
    }

    let content = match args.format {
        OutputFormat::Json => report::generate_json(&dashboard)?,
        OutputFormat::Markdown => {
            report::generate_dashboard_markdown(&dashboard, &settings.icon_table())
        }
    };

    Ok(Rendered {
        content,
        failed,
        total,
    })
}

async fn run_quotes(
    args: &Args,
    config: &Config,
    index: usize,
    count: usize,
    reverse: bool,
) -> Result<Rendered> {
    let client = QuoteClient::new(&config.quotes, config.general.timeout_seconds)?;
    let mut deck = client.deck().await.context("Failed to load quotes")?;

    if deck.is_empty() {
        warn!("The quote service returned no quotes");
    }
    let picked = quotes::browse(&mut deck, index, count, reverse);
    debug!("Deck cursor left at {}", deck.position());

    let content = match args.format {
        OutputFormat::Json => report::generate_json(&picked)?,
        OutputFormat::Markdown => report::generate_quotes_markdown(&picked, deck.len()),
    };

    Ok(Rendered {
        content,
        failed: 0,
        total: 1,
    })
}

async fn run_news(
    args: &Args,
    config: &Config,
    page: u32,
    search: Option<&str>,
) -> Result<Rendered> {
    let client = NewsClient::new(&config.news, config.general.timeout_seconds)?;
    let feed = client.feed(page, search).await?;

    if page > feed.page_count {
        warn!("Page {} is past the last page ({})", page, feed.page_count);
    }

    let content = match args.format {
        OutputFormat::Json => report::generate_json(&feed)?,
        OutputFormat::Markdown => report::generate_feed_markdown(&feed),
    };

    Ok(Rendered {
        content,
        failed: 0,
        total: 1,
    })
}

async fn run_posts(args: &Args, config: &Config, references: &[String]) -> Result<Rendered> {
    let client = NewsClient::new(&config.news, config.general.timeout_seconds)?;
    let observer = ProgressObserver::new(references.len(), "Posts", args.quiet);
    let views = client.posts(references, &observer).await?;
    observer.finish();

    let failed = views
        .iter()
        .filter(|view| matches!(view, PostView::Missing { .. }))
        .count();

    let content = match args.format {
        OutputFormat::Json => report::generate_json(&views)?,
        OutputFormat::Markdown => report::generate_posts_markdown(&views),
    };

    Ok(Rendered {
        content,
        failed,
        total: views.len(),
    })
}
