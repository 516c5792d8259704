//! # Progress Bar and Statistics Module
//!
//! Questo modulo gestisce la progress bar e le statistiche aggregate della run.
//!
//! ## Componenti principali:
//! - `ProgressManager`: progress bar `indicatif` (nascosta in modalità JSON)
//! - `OptimizationStats`: contatori cumulativi della run
//!
//! ## Statistiche tracciate:
//! - **files_processed**: file elaborati (successi + errori)
//! - **files_optimized**: file modificati su disco (resize e/o ricompressione)
//! - **files_unchanged**: file lasciati byte-identici
//! - **files_resized**: file ridimensionati a `max_width`
//! - **errors**: file falliti (probe, resize o compressione)
//! - **total_bytes_saved** / **total_original_size**
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [========================================>-] 149/150 (99%) photo.jpg: 45.20% smaller
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::file_manager::FileManager;
use crate::optimizer::task_optimizer::FileOutcome;

/// Manages the terminal progress bar
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a progress bar for `total_files`
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress bar that draws nothing (JSON mode, tests)
    pub fn hidden(total_files: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total_files);
        Self { bar }
    }

    /// Advance by one file with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Set a message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Run `f` with the bar cleared, so log lines on stderr are not drawn over
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Aggregate counters for one run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OptimizationStats {
    pub files_processed: usize,
    pub files_optimized: usize,
    pub files_unchanged: usize,
    pub files_resized: usize,
    pub errors: usize,
    pub total_bytes_saved: u64,
    pub total_original_size: u64,
}

impl OptimizationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file that went through the pipeline without error
    pub fn add_outcome(&mut self, outcome: &FileOutcome) {
        self.files_processed += 1;
        self.total_original_size += outcome.original_size;
        self.total_bytes_saved += outcome.bytes_saved();
        if outcome.resized_to.is_some() {
            self.files_resized += 1;
        }
        if outcome.changed() {
            self.files_optimized += 1;
        } else {
            self.files_unchanged += 1;
        }
    }

    pub fn add_error(&mut self) {
        self.files_processed += 1;
        self.errors += 1;
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.total_original_size > 0 {
            (self.total_bytes_saved as f64 / self.total_original_size as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Optimized: {} (resized: {}) | Unchanged: {} | Errors: {} | Total saved: {} ({:.2}%)",
            self.files_processed,
            self.files_optimized,
            self.files_resized,
            self.files_unchanged,
            self.errors,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}
