//! # JSON Output Module
//!
//! Output strutturato (una riga JSON per evento su stdout) attivato con `--json`,
//! per chi pilota lo shrinker da un altro processo.
//!
//! ## Tipi di messaggi:
//! - `start`: inizio run (root, numero di file, configurazione)
//! - `file_start`: inizio elaborazione di un file
//! - `file_complete`: fine elaborazione di un file (con eventuale errore)
//! - `progress`: stato corrente (`k/n`, percentuale, ETA)
//! - `complete`: fine run con statistiche finali e timestamp
//! - `error`: errore fatale

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Config;
use crate::optimizer::progress_tracker::ProgressSnapshot;
use crate::optimizer::task_optimizer::FileOutcome;
use crate::progress::OptimizationStats;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Start {
        root: PathBuf,
        total_files: usize,
        started_at: String,
        config: JsonConfig,
    },

    FileStart {
        path: PathBuf,
        size: u64,
        index: usize,
        total: usize,
    },

    FileComplete {
        path: PathBuf,
        original_size: u64,
        final_size: u64,
        reduction_percent: f64,
        resized_to: Option<String>,
        recompressed: bool,
        error: Option<String>,
    },

    Progress {
        completed: usize,
        total: usize,
        percent: u32,
        elapsed_seconds: f64,
        eta_seconds: Option<f64>,
    },

    Complete {
        files_processed: usize,
        files_optimized: usize,
        files_unchanged: usize,
        errors: usize,
        total_bytes_saved: u64,
        average_reduction: f64,
        started_at: String,
        finished_at: String,
        duration_seconds: f64,
    },

    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione esposta nel messaggio `start`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonConfig {
    pub max_width: u32,
    pub jpeg_quality: u8,
    pub webp_quality: u8,
    pub png_quality: String,
    pub batch_size: usize,
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_width: config.max_width,
            jpeg_quality: config.jpeg_quality,
            webp_quality: config.webp_quality,
            png_quality: config.png_quality_arg(),
            batch_size: config.batch_size,
        }
    }
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(root: PathBuf, total_files: usize, started_at: String, config: &Config) -> Self {
        Self::Start {
            root,
            total_files,
            started_at,
            config: JsonConfig::from(config),
        }
    }

    pub fn file_start(path: PathBuf, size: u64, index: usize, total: usize) -> Self {
        Self::FileStart { path, size, index, total }
    }

    /// Messaggio di completamento per un file riuscito
    pub fn file_complete(outcome: &FileOutcome) -> Self {
        Self::FileComplete {
            path: outcome.path.clone(),
            original_size: outcome.original_size,
            final_size: outcome.final_size,
            reduction_percent: outcome.reduction_percent(),
            resized_to: outcome.resized_to.map(|m| m.to_string()),
            recompressed: outcome.recompressed,
            error: None,
        }
    }

    /// Messaggio di completamento per un file fallito; la dimensione è quella rimasta su disco
    pub fn file_failed(path: PathBuf, size: u64, error: String) -> Self {
        Self::FileComplete {
            path,
            original_size: size,
            final_size: size,
            reduction_percent: 0.0,
            resized_to: None,
            recompressed: false,
            error: Some(error),
        }
    }

    pub fn progress(snapshot: &ProgressSnapshot) -> Self {
        Self::Progress {
            completed: snapshot.completed,
            total: snapshot.total,
            percent: snapshot.percent,
            elapsed_seconds: snapshot.elapsed.as_secs_f64(),
            eta_seconds: snapshot.eta.map(|eta| eta.as_secs_f64()),
        }
    }

    pub fn complete(
        stats: &OptimizationStats,
        started_at: String,
        finished_at: String,
        duration_seconds: f64,
    ) -> Self {
        Self::Complete {
            files_processed: stats.files_processed,
            files_optimized: stats.files_optimized,
            files_unchanged: stats.files_unchanged,
            errors: stats.errors,
            total_bytes_saved: stats.total_bytes_saved,
            average_reduction: stats.overall_reduction_percent(),
            started_at,
            finished_at,
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}
