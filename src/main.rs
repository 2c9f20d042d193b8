//! Campus-Harvest main entry point
//!
//! This is the command-line interface for the Campus-Harvest crawler.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use campus_harvest::config::{load_config_with_hash, Config};
use campus_harvest::crawler::{open_backends, run_crawl};
use campus_harvest::output::print_statistics;
use campus_harvest::Scope;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Campus-Harvest: a bounded campus-site crawler
///
/// Crawls the hosts under the configured suffixes, records webpages and
/// document metadata as JSON lines (or SQLite), and keeps raw HTML snapshots.
#[derive(Parser, Debug)]
#[command(name = "campus-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded campus-site crawler", long_about = None)]
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

    /// Validate config and show the resolved seed without crawling
    #[arg(long, conflicts_with = "snapshot")]
    dry_run: bool,

    /// Print the stored snapshot with this id and exit
    #[arg(long, value_name = "ID", conflicts_with = "dry_run")]
    snapshot: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if let Some(id) = &cli.snapshot {
        handle_snapshot(&config, id)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout may carry JSON-lines records.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("campus_harvest=info,warn"),
            1 => EnvFilter::new("campus_harvest=debug,info"),
            2 => EnvFilter::new("campus_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration and seed
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let scope = Scope::new(&config.scope.allowed_suffixes, &config.scope.exclude);
    let seed = scope.resolve_seed(
        &config.crawler.start_url,
        config.crawler.default_seed.as_deref(),
    )?;

    println!("=== Campus-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Resolved seed: {}", seed);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Delay: {}s", config.crawler.delay);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    println!(
        "  Attachment page budget: {}",
        config.crawler.attachment_page_budget
    );

    println!("\nFetch:");
    println!("  Max retries: {}", config.fetch.max_retries);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  Prefer HTTP: {}", config.fetch.prefer_http);

    println!("\nScope:");
    for suffix in &config.scope.allowed_suffixes {
        println!("  + {}", suffix);
    }
    for pattern in &config.scope.exclude {
        println!("  - {}", pattern);
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    match &config.output.database_path {
        Some(path) => println!("  Database: {}", path),
        None => {
            println!("  Snapshots: {}", config.output.snapshot_dir);
            println!(
                "  Records: {}",
                config.output.records_path.as_deref().unwrap_or("<stdout>")
            );
        }
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --snapshot mode: writes raw HTML to stdout
fn handle_snapshot(config: &Config, id: &str) -> anyhow::Result<()> {
    let (snapshots, _) = open_backends(config)?;
    match snapshots.load(id)? {
        Some(bytes) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
            Ok(())
        }
        None => bail!("Snapshot {} not found", id),
    }
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    // Records own stdout unless they go to a file or database
    let stdout_free =
        config.output.records_path.is_some() || config.output.database_path.is_some();

    let stats = run_crawl(config).await.context("Crawl failed")?;
    tracing::info!("Crawl completed successfully");

    if stdout_free {
        print_statistics(&stats);
    } else {
        tracing::info!(
            "{} URLs visited, {} webpages, {} documents, {} snapshots",
            stats.visited(),
            stats.webpages,
            stats.documents,
            stats.snapshots_saved
        );
    }
    Ok(())
}
