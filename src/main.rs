//! Site-Gleaner main entry point
//!
//! This is the command-line interface for the Site-Gleaner page harvester.

use anyhow::Context;
use clap::Parser;
use site_gleaner::config::{load_config, with_root_override, Config};
use site_gleaner::crawler::Coordinator;
use site_gleaner::output::print_report;
use site_gleaner::storage::open_store;
use site_gleaner::SiteScope;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Site-Gleaner: a polite single-site page harvester
///
/// Site-Gleaner discovers every HTML page of one website, from its sitemap or
/// by crawling from the root, while respecting robots.txt and a global rate
/// limit. It writes one text record per page.
#[derive(Parser, Debug)]
#[command(name = "site-gleaner")]
#[command(version)]
#[command(about = "A polite single-site page harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long)]
    dry_run: bool,

    /// Crawl this root URL instead of the configured site.root-origin
    #[arg(long, value_name = "URL")]
    root: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    if let Some(root) = &cli.root {
        config = with_root_override(config, root).context("Invalid --root")?;
    }

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_gleaner=info,warn"),
            1 => EnvFilter::new("site_gleaner=debug,info"),
            2 => EnvFilter::new("site_gleaner=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let scope = SiteScope::new(&config.site.root_origin)?;
    let crawler = &config.crawler;

    println!("=== Site-Gleaner Dry Run ===\n");

    println!("Site:");
    println!("  Root: {}", scope.root());
    println!("  robots.txt: {}", scope.robots_url());
    println!(
        "  Source label: {}",
        config
            .site
            .source
            .clone()
            .unwrap_or_else(|| scope.default_source())
    );

    println!("\nCrawler Configuration:");
    println!("  Rate limit interval: {}ms", crawler.rate_limit_interval);
    println!("  Request timeout: {}ms", crawler.request_timeout);
    println!(
        "  Retries: {} (backoff {}ms, doubling)",
        crawler.max_retries, crawler.retry_backoff
    );
    println!("  Max pages (breadth-first): {}", crawler.max_pages);
    match crawler.max_crawl_time {
        Some(secs) => println!("  Max crawl time: {}s", secs),
        None => println!("  Max crawl time: unlimited"),
    }
    println!("  Workers: {}", crawler.workers);
    println!("  Respect Crawl-delay: {}", crawler.respect_crawl_delay);

    println!("\nUser Agent:");
    println!("  Header: {}", config.user_agent.header_value());
    println!("  robots.txt token: {}", config.user_agent.robots_token());

    println!("\nOutput:");
    println!("  Format: {}", config.output.format);
    println!("  Path: {}", config.output.path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config.output).context("Failed to open output store")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight requests");
            on_interrupt.cancel();
        }
    });

    let report = Coordinator::new(config, store)
        .with_cancellation(cancel)
        .run()
        .await
        .context("Crawl could not start")?;

    print_report(&report);

    Ok(())
}
