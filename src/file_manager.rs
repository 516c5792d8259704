//! # File Management Module
//!
//! Questo modulo gestisce la discovery delle immagini e le operazioni sui file.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva delle immagini sotto una directory root
//! - Tolleranza agli errori di listing delle sottocartelle (log + skip)
//! - Utilità per dimensioni e percentuali di riduzione
//!
//! ## Formati supportati:
//! - **Raster**: JPG, JPEG, PNG, GIF, WebP
//! - **Vettoriali**: SVG
//!
//! ## Discovery:
//! - `walkdir` con ordinamento per nome: output deterministico per un albero statico
//! - I symlink non vengono seguiti, quindi nessun path viene visitato due volte
//! - Root inesistente o illeggibile → errore fatale (`OptimizeError::Discovery`)
//! - Sottocartella illeggibile → `warn!` e si prosegue con le sorelle
//!
//! ## Esempio:
//! ```ignore
//! let tasks = FileManager::find_image_files(Path::new("."))?;
//! for task in tasks {
//!     println!("{} ({})", task.path.display(), task.extension);
//! }
//! ```

use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::OptimizeError;
use crate::format::ImageTask;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Size of a file in bytes
    pub async fn file_size(path: &Path) -> Result<u64, OptimizeError> {
        Ok(fs::metadata(path).await?.len())
    }

    /// Find all recognized image files under `root`, in deterministic order.
    ///
    /// Only a root that is missing, not a directory or not listable is an error.
    pub fn find_image_files(root: &Path) -> Result<Vec<ImageTask>, OptimizeError> {
        let metadata = std::fs::metadata(root).map_err(|e| {
            OptimizeError::Discovery(format!("cannot access {}: {}", root.display(), e))
        })?;
        if !metadata.is_dir() {
            return Err(OptimizeError::Discovery(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        std::fs::read_dir(root).map_err(|e| {
            OptimizeError::Discovery(format!("cannot list {}: {}", root.display(), e))
        })?;

        let mut tasks = Vec::new();
        let mut skipped_dirs = 0usize;

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let location = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    warn!("Skipping unreadable path {}: {}", location, e);
                    skipped_dirs += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(task) = ImageTask::from_path(entry.into_path()) {
                tasks.push(task);
            }
        }

        debug!(
            "Discovery under {} found {} images ({} unreadable entries skipped)",
            root.display(),
            tasks.len(),
            skipped_dirs
        );

        Ok(tasks)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut value = size as f64;
        let mut unit = 0;

        while value >= 1024.0 && unit < UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }

        if unit == 0 {
            format!("{} {}", size, UNITS[0])
        } else {
            format!("{:.2} {}", value, UNITS[unit])
        }
    }

    /// Percentage reduction `(original - new) / original * 100`
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
