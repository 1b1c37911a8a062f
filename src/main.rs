//! Stream Aggregator main entry point
//!
//! Loads the service configuration, wires crawlers, resolver and sink
//! together and runs the scheduler until Ctrl-C.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stream_aggregator::config::{load_config, ServiceConfig};
use stream_aggregator::fetch::build_http_client;
use stream_aggregator::notify::{ChannelNotifier, ConnectionState};
use stream_aggregator::sink::{HttpSink, Sink};
use stream_aggregator::{Aggregator, CancellationRegistry, Fetcher, Scheduler};
use tracing_subscriber::EnvFilter;

/// Stream Aggregator: republishes playable media metadata on a schedule
///
/// Crawls the latest-publications listing and the home page, resolves HLS
/// manifests and publishes the merged batch to the state API whenever the
/// announced configuration is due.
#[derive(Parser, Debug)]
#[command(name = "stream-aggregator")]
#[command(version)]
#[command(about = "Aggregates playable media metadata", long_about = None)]
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

    /// Configuration URL to announce at startup, overriding the config file
    #[arg(long, value_name = "URL")]
    config_url: Option<String>,

    /// Validate config and show the resolved settings without running
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    if cli.dry_run {
        handle_dry_run(&config, cli.config_url.as_deref());
        return Ok(());
    }

    run_service(config, cli.config_url).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("stream_aggregator=info,warn"),
            1 => EnvFilter::new("stream_aggregator=debug,info"),
            2 => EnvFilter::new("stream_aggregator=trace,debug"),
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

/// Handles the --dry-run mode: prints the resolved settings
fn handle_dry_run(config: &ServiceConfig, config_url: Option<&str>) {
    println!("=== Stream Aggregator Dry Run ===\n");

    println!("Sources:");
    println!("  Latest publications: {}", config.sources.latest_url);
    println!("  Home page: {}", config.sources.home_url);

    println!("\nCrawler:");
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Timeout retries: {}", config.crawler.timeout_retries);
    println!("  Detail timeout: {}s", config.crawler.detail_timeout_secs);
    println!("  Max rounds: {}", config.crawler.max_rounds);
    println!("  Manifest scheme: {}", config.crawler.manifest_scheme);

    println!("\nSink:");
    println!("  Base URL: {}", config.sink.base_url);
    println!("  Publish path: {}", config.sink.publish_path);
    println!("  Request timeout: {}s", config.sink.timeout_secs);

    println!("\nNotifier:");
    println!("  Topic: {}", config.notifier.topic);
    match config_url.or(config.notifier.config_url.as_deref()) {
        Some(url) => println!("  Startup configuration: {}", url),
        None => println!("  Startup configuration: none"),
    }

    if let Some(path) = &config.output.snapshot_path {
        println!("\nSnapshot: {}", path);
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());
    println!("\n✓ Configuration is valid");
}

/// Runs the scheduler until Ctrl-C
async fn run_service(config: ServiceConfig, config_url: Option<String>) -> anyhow::Result<()> {
    let client = build_http_client(&config.user_agent).context("Failed to build HTTP client")?;
    let sink: Arc<dyn Sink> =
        Arc::new(HttpSink::new(client.clone(), &config.sink).context("Invalid sink configuration")?);
    let aggregator = Arc::new(Aggregator::from_config(
        &config,
        Fetcher::new(client),
        sink,
    ));

    let registry = CancellationRegistry::new();
    let scheduler = Scheduler::new(aggregator, registry);

    let notifier = ChannelNotifier::new();
    notifier.set_state(ConnectionState::Connected);
    let topic = config.notifier.topic.as_str();
    match config_url.or_else(|| config.notifier.config_url.clone()) {
        Some(url) => {
            tracing::info!("Announcing startup configuration {}", url);
            notifier.publish(topic, url);
        }
        None => tracing::warn!("No startup configuration, waiting for notifications on '{}'", topic),
    }

    let result: anyhow::Result<()> = tokio::select! {
        _ = scheduler.run(&notifier, topic) => {
            tracing::warn!("Notifier closed, stopping");
            Ok(())
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Shutdown requested");
            Ok(())
        }
    };

    scheduler.shutdown();
    tracing::info!("Stopped");
    result
}
