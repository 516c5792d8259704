//! # Configuration Management Module
//!
//! Questo modulo raccoglie le costanti della pipeline in una struct `Config`.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di ottimizzazione
//! - Fornisce valori di default (gli unici usati dal binario)
//! - Valida i parametri prima dell'avvio dell'orchestratore
//!
//! ## Parametri di configurazione:
//! - `max_width`: Larghezza massima in pixel (default: 2500)
//! - `jpeg_quality`: Qualità JPEG (1-100, default: 80)
//! - `webp_quality`: Qualità WebP (1-100, default: 80)
//! - `png_quality_min` / `png_quality_max`: Range di quantizzazione PNG (default: 0.65-0.8)
//! - `batch_size`: Raggruppamento dei file nei log (default: 10)
//! - `eta_min_samples`: File completati prima di stimare l'ETA (default: 10)
//! - `json_output`: Eventi JSON su stdout invece della progress bar (default: false)
//!
//! Le qualità non sono esposte da riga di comando: il profilo è fisso.
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     batch_size: 25,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::OptimizeError;

/// Width ceiling above which images are downscaled
pub const MAX_WIDTH: u32 = 2500;

/// Configuration for the shrinking pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Images wider than this are downscaled to exactly this width
    pub max_width: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// WebP quality (1-100)
    pub webp_quality: u8,
    /// Lower bound of the PNG quantization range (0.0-1.0)
    pub png_quality_min: f32,
    /// Upper bound of the PNG quantization range (0.0-1.0)
    pub png_quality_max: f32,
    /// Files per log batch
    pub batch_size: usize,
    /// ETA is reported only after more than this many files completed
    pub eta_min_samples: usize,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_width: MAX_WIDTH,
            jpeg_quality: 80,
            webp_quality: 80,
            png_quality_min: 0.65,
            png_quality_max: 0.8,
            batch_size: 10,
            eta_min_samples: 10,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 {
            return Err(OptimizeError::Validation("Max width must be greater than 0".into()).into());
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(OptimizeError::Validation("JPEG quality must be between 1 and 100".into()).into());
        }

        if self.webp_quality == 0 || self.webp_quality > 100 {
            return Err(OptimizeError::Validation("WebP quality must be between 1 and 100".into()).into());
        }

        if self.png_quality_min <= 0.0
            || self.png_quality_max > 1.0
            || self.png_quality_min > self.png_quality_max
        {
            return Err(OptimizeError::Validation(
                "PNG quality range must satisfy 0 < min <= max <= 1".into(),
            )
            .into());
        }

        if self.batch_size == 0 {
            return Err(OptimizeError::Validation("Batch size must be greater than 0".into()).into());
        }

        Ok(())
    }

    /// PNG quality range in the `min-max` percent form pngquant expects
    pub fn png_quality_arg(&self) -> String {
        format!(
            "{}-{}",
            (self.png_quality_min * 100.0).round() as u32,
            (self.png_quality_max * 100.0).round() as u32
        )
    }
}
