//! # Space Image Shrinker - Main Entry Point
//!
//! Punto di ingresso dell'applicazione.
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (directory opzionale, batch size, json, verbose)
//! 2. Configura il logging su stderr (INFO, DEBUG con `--verbose`, oppure `RUST_LOG`)
//! 3. Senza argomenti la root è la working directory
//! 4. Crea `Config` e avvia `MediaOptimizer`
//!
//! Exit code non-zero solo per errori fatali (root mancante/illeggibile, config invalida);
//! gli errori sui singoli file non cambiano l'exit code.
//!
//! ## Esempio di utilizzo:
//! ```bash
//! cd ~/site/assets && image-shrinker
//! image-shrinker ./public/img --batch-size 25 --verbose
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use space_image_shrinker::{
    json_output::JsonMessage, platform::PlatformCommands, Config, MediaOptimizer, RunReport,
};

#[derive(Parser)]
#[command(name = "image-shrinker")]
#[command(about = "Shrink images in place: cap width at 2500px and recompress")]
struct Args {
    /// Directory to scan (defaults to the current directory)
    directory: Option<PathBuf>,

    /// Number of files per logged batch
    #[arg(short, long, default_value = "10")]
    batch_size: usize,

    /// Emit JSON events on stdout instead of the progress bar
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!("{}", PlatformCommands::instance().system_info());

    let root = match args.directory {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine the current directory")?,
    };

    let config = Config {
        batch_size: args.batch_size,
        json_output: args.json,
        ..Default::default()
    };
    let json_output = config.json_output;

    if let Err(e) = run(&root, config).await {
        error!("Run aborted: {:#}", e);
        if json_output {
            JsonMessage::error("Run aborted".to_string(), Some(format!("{:#}", e))).emit();
        }
        return Err(e);
    }

    Ok(())
}

async fn run(root: &Path, config: Config) -> Result<RunReport> {
    MediaOptimizer::new(root, config)?.run().await
}
