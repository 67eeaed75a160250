use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use batchsync::{init_tracing, run_upload, Target, UploadRequest};
use batchsync_config::RuntimeConfig;
use batchsync_core::InputFormat;
use batchsync_uploader::resolve_base_url;
use clap::{Args, Parser, Subcommand};
use tracing::info;

/// Push prepared record collections to a sync endpoint in paced, retried batches
#[derive(Parser)]
#[command(name = "batchsync")]
#[command(version)]
#[command(about = "Push prepared record collections to a sync endpoint in paced, retried batches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a record file to a destination
    Upload(UploadArgs),
    /// Print the base URL uploads would use
    Resolve {
        /// Also print the full endpoint of this destination
        #[arg(short, long, value_name = "NAME")]
        destination: Option<String>,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
struct UploadArgs {
    /// Destination name from [destinations.<name>]
    #[arg(
        short,
        long,
        value_name = "NAME",
        conflicts_with = "path",
        required_unless_present = "path"
    )]
    destination: Option<String>,

    /// Endpoint path, e.g. /api/sync/vendas
    #[arg(short, long, value_name = "PATH")]
    path: Option<String>,

    /// Record file (JSON array or JSON Lines)
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Input format; detected from the file extension by default
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<InputFormat>,

    /// Base URL (skips the local server probe)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Records per request (overrides config)
    #[arg(short, long, value_name = "N")]
    batch_size: Option<usize>,

    /// Show the batch plan without sending anything
    #[arg(long)]
    dry_run: bool,
}

impl UploadArgs {
    fn into_request(self) -> Result<UploadRequest> {
        let target = match (self.destination, self.path) {
            (Some(name), _) => Target::Destination(name),
            (None, Some(path)) => Target::Path(path),
            (None, None) => anyhow::bail!("either --destination or --path is required"),
        };
        Ok(UploadRequest {
            target,
            input: self.input,
            format: self.format,
            base_url: self.base_url,
            batch_size: self.batch_size,
            dry_run: self.dry_run,
        })
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Step 3: Initialize tracing, then report config warnings through it
    init_tracing(&config.log);
    config.log_warnings();

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Resolve { destination } => block_on(run_resolve(config, destination)),
        Commands::Upload(args) => {
            let request = args.into_request()?;
            block_on(run_upload_command(config, request))
        }
    }
}

fn block_on<F: std::future::Future<Output = Result<ExitCode>>>(future: F) -> Result<ExitCode> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(future)
}

fn load_config(cli: &Cli) -> Result<RuntimeConfig> {
    // Step 1: Load base configuration
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load_or_default().context("Failed to load configuration")?
    };

    // Step 2: Apply CLI overrides (highest priority)
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }

    Ok(config)
}

async fn run_resolve(config: RuntimeConfig, destination: Option<String>) -> Result<ExitCode> {
    let resolved = resolve_base_url(&config.endpoint).await?;
    info!(source = %resolved.source, "Resolved base URL");

    match destination {
        Some(name) => {
            let destination = config.destination(&name)?;
            let endpoint = batchsync_uploader::join_endpoint(&resolved.url, &destination.path)?;
            println!("{}", endpoint);
        }
        None => println!("{}", resolved.url),
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_upload_command(config: RuntimeConfig, request: UploadRequest) -> Result<ExitCode> {
    display_startup_info(&config, &request);

    match run_upload(&config, &request).await? {
        Some(report) if !report.succeeded() => Ok(ExitCode::FAILURE),
        _ => Ok(ExitCode::SUCCESS),
    }
}

fn display_startup_info(config: &RuntimeConfig, request: &UploadRequest) {
    info!("╭─────────────────────────────────────────────────");
    info!("│ batchsync v{}", env!("CARGO_PKG_VERSION"));
    info!("├─────────────────────────────────────────────────");
    match &request.target {
        Target::Destination(name) => info!("│ Destination: {}", name),
        Target::Path(path) => info!("│ Path: {}", path),
    }
    info!("│ Input: {}", request.input.display());
    info!(
        "│ Retry: {} attempts, {}s linear backoff",
        config.retry.max_attempts, config.retry.base_wait_secs
    );
    info!("│ Pacing: {}ms between batches", config.retry.pacing_ms);
    info!("│ Log level: {}", config.log.level);
    info!("╰─────────────────────────────────────────────────");
}
