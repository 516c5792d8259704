//! # Space Image Shrinker Library
//!
//! Modulo principale della libreria: dichiara i moduli ed espone le API pubbliche.
//!
//! ## Architettura dei moduli:
//! - `config`: Costanti della pipeline e validazione
//! - `error`: Tipi di errore per file e per pipeline
//! - `format`: Estensioni riconosciute → compressore, task e dimensioni
//! - `file_manager`: Discovery ricorsiva e utilità sui file
//! - `svg`: Probe e resize SVG in-process
//! - `image_processor`: Trait `ImageBackend` e backend basato su tool esterni
//! - `platform` / `tool_resolver`: Ricerca dei tool esterni
//! - `optimizer`: Orchestratore, worker per file e progress
//! - `progress`: Progress bar e statistiche aggregate
//! - `json_output`: Eventi JSON per `--json`
//!
//! ## Utilizzo:
//! ```ignore
//! use space_image_shrinker::{Config, MediaOptimizer};
//!
//! let optimizer = MediaOptimizer::new(&path, Config::default())?;
//! let report = optimizer.run().await?;
//! println!("{}", report.stats.format_summary());
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod file_manager;
pub mod svg;
pub mod image_processor;
pub mod platform;
pub mod tool_resolver;
pub mod utils;
pub mod optimizer;
pub mod progress;
pub mod json_output;

pub use config::{Config, MAX_WIDTH};
pub use error::OptimizeError;
pub use format::{Compressor, ImageExtension, ImageMetadata, ImageTask};
pub use image_processor::{ExternalToolBackend, ImageBackend};
pub use optimizer::{FileOutcome, MediaOptimizer, RunReport};
