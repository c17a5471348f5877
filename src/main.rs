//! tsblock CLI
//!
//! Command-line front end for the block engine:
//! - Ingest a source file into blocks
//! - Fetch a block by number or by timestamp
//! - List cataloged blocks and store statistics
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tsblock::config::{generate_default_config, Config, LoggingConfig, MalformedPolicy};
use tsblock::Engine;

#[derive(Parser)]
#[command(name = "tsblock")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chunk large timestamped record files into indexed blocks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/tsblock/config.toml, then ./tsblock.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the number of records per block
    #[arg(long, global = true)]
    pub block_size: Option<usize>,

    /// Drop malformed lines instead of failing the run
    #[arg(long, global = true)]
    pub skip_malformed: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a source file
    Ingest {
        /// Path to the source file
        path: PathBuf,
    },

    /// Fetch a block by number
    Block {
        /// Source path or store name
        source: PathBuf,
        /// Block number
        number: u64,
    },

    /// Fetch the block indexed under a timestamp
    At {
        /// Source path or store name
        source: PathBuf,
        /// Timestamp (first record of a block)
        #[arg(allow_negative_numbers = true)]
        timestamp: i64,
    },

    /// List cataloged blocks
    Blocks {
        /// Source path or store name
        source: PathBuf,
    },

    /// Show store statistics
    Stats {
        /// Source path or store name
        source: PathBuf,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tsblock={}", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if let Some(block_size) = cli.block_size {
        config.storage.block_size = block_size;
    }
    if cli.skip_malformed {
        config.storage.malformed = MalformedPolicy::Skip;
    }

    config.storage.validate()?;
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("writing config to {:?}", path))?;
                eprintln!("Wrote default config to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    init_logging(&config.logging);

    tracing::debug!("tsblock v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Data directory: {:?}", config.storage.data_dir);

    let mut engine = Engine::new(config.storage)?;

    match &cli.command {
        Commands::Ingest { path } => {
            let outcome = engine
                .ingest(path)
                .await
                .with_context(|| format!("ingesting {:?}", path))?;
            print_json(&outcome)?;
        }

        Commands::Block { source, number } => {
            let block = engine.fetch_block(source, *number).await?;
            print_json(&block)?;
        }

        Commands::At { source, timestamp } => {
            let block = engine.fetch_block_by_timestamp(source, *timestamp).await?;
            print_json(&block)?;
        }

        Commands::Blocks { source } => {
            print_json(&engine.list_blocks(source)?)?;
        }

        Commands::Stats { source } => {
            let stats = engine.stats(source)?;
            tracing::info!("{}", stats);
            print_json(&stats)?;
        }

        // handled before the engine is opened
        Commands::Config { .. } => {}
    }

    engine.shutdown()?;
    Ok(())
}
