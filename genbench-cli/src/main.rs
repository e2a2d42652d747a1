//! genbench CLI: run benchmark inference and scoring from the terminal, or
//! serve single-sample inference over HTTP.

mod commands;
mod serve;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// genbench: benchmark inference and evaluation for causal language models
#[derive(Parser, Debug)]
#[command(name = "genbench", version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset file, overriding the configured name/split lookup
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Model server base URL
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Device requested from the model server: cpu, cuda[:N], mps
    #[arg(long)]
    device: Option<String>,

    /// Records per generation batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Prompt truncation and generation length
    #[arg(long)]
    max_length: Option<usize>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Profile the raw dataset
    Analyze,
    /// Probe the model with one forward pass and print its report
    ModelReport,
    /// Generate a prediction for one dataset record
    Sample {
        /// Record position in the canonical table
        #[arg(default_value = "0")]
        index: usize,
    },
    /// Generate predictions for the whole dataset and save them
    Infer {
        /// Prediction file, overriding the configured path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Score a saved prediction file
    Evaluate {
        /// Prediction file, overriding the configured path
        #[arg(short, long)]
        predictions: Option<PathBuf>,
        /// Metric names, overriding the configured list
        #[arg(short, long, value_delimiter = ',')]
        metrics: Vec<String>,
    },
    /// Analyze, infer, save and evaluate in one go
    Run,
    /// Serve single-sample inference over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "genbench", "genbench")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "genbench.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let mut config = genbench_core::load_config(cli.config.as_deref(), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Apply CLI overrides
    if let Some(path) = cli.dataset {
        config.dataset.path = Some(path);
    }
    if let Some(endpoint) = cli.endpoint {
        config.model.endpoint = Some(endpoint);
    }
    if let Some(device) = &cli.device {
        config.model.device = device
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid --device: {}", e))?;
    }
    if let Some(batch_size) = cli.batch_size {
        config.inference.batch_size = batch_size;
    }
    if let Some(max_length) = cli.max_length {
        config.inference.max_length = max_length;
    }

    commands::handle_command(cli.command, config)
}
