//! # Task Optimizer Module
//!
//! Worker per l'elaborazione di un singolo file, in place.
//!
//! ## Passi (ognuno può essere saltato):
//! 1. **Probe**: larghezza/altezza; se fallisce il file non viene toccato
//! 2. **Resize**: solo se `width > max_width`; bytes → `<file>.temp` → delete originale → rename
//! 3. **Ricompressione**: compressore scelto dall'estensione, sul contenuto corrente
//! 4. **Commit condizionale**: si scrive solo se il risultato è strettamente più piccolo
//!
//! Il resize viene committato prima della ricompressione: se la ricompressione fallisce il
//! file resta ridimensionato ma non ottimizzato, e l'errore viene riportato.
//!
//! Un errore qui non esce mai dal file: `MediaOptimizer` lo logga e passa al successivo.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    config::Config,
    file_manager::FileManager,
    format::{ImageMetadata, ImageTask},
    image_processor::ImageBackend,
    optimizer::path_resolver::TempFileGuard,
};

/// What happened to one file
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub original_size: u64,
    pub final_size: u64,
    pub dimensions: ImageMetadata,
    pub resized_to: Option<ImageMetadata>,
    pub recompressed: bool,
}

impl FileOutcome {
    /// True if the file on disk differs from the one found at discovery
    pub fn changed(&self) -> bool {
        self.resized_to.is_some() || self.recompressed
    }

    pub fn bytes_saved(&self) -> u64 {
        self.original_size.saturating_sub(self.final_size)
    }

    pub fn reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.original_size, self.final_size)
    }
}

/// Worker per elaborazione singoli file
pub struct TaskOptimizer {
    pub config: Config,
    backend: Arc<dyn ImageBackend>,
}

impl TaskOptimizer {
    /// Crea nuovo task optimizer
    pub fn new(config: Config, backend: Arc<dyn ImageBackend>) -> Self {
        Self { config, backend }
    }

    pub fn backend(&self) -> &dyn ImageBackend {
        self.backend.as_ref()
    }

    /// Processa un singolo file
    pub async fn process_single_file(&self, task: &ImageTask) -> Result<FileOutcome> {
        let name = task.display_name();
        let original_size = FileManager::file_size(&task.path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read size of {}: {}", task.path.display(), e))?;

        let dimensions = self
            .backend
            .probe(task)
            .await
            .map_err(|e| anyhow::anyhow!("Probe failed for {}: {}", task.path.display(), e))?;
        debug!("{}: {} {} ({})", name, task.extension, dimensions, FileManager::format_size(original_size));

        let resized_to = match dimensions.downscaled_to(self.config.max_width) {
            Some(target) => {
                self.resize_in_place(task, dimensions, target).await?;
                Some(target)
            }
            None => {
                debug!("{}: width {} <= {}, no resize", name, dimensions.width, self.config.max_width);
                None
            }
        };

        let recompressed = self.recompress_in_place(task).await?;

        let final_size = FileManager::file_size(&task.path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read size of {}: {}", task.path.display(), e))?;

        Ok(FileOutcome {
            path: task.path.clone(),
            original_size,
            final_size,
            dimensions,
            resized_to,
            recompressed,
        })
    }

    /// Steps 2: resize through `<file>.temp`; the original is removed only after the write
    async fn resize_in_place(&self, task: &ImageTask, from: ImageMetadata, target: ImageMetadata) -> Result<()> {
        let resized = self
            .backend
            .resize(task, target)
            .await
            .map_err(|e| anyhow::anyhow!("Resize failed for {}: {}", task.path.display(), e))?;

        let guard = TempFileGuard::new(&task.path);
        guard
            .write(&resized)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", guard.temp_path().display(), e))?;
        guard
            .commit()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to replace {}: {}", task.path.display(), e))?;

        info!("{}: resized {} -> {}", task.display_name(), from, target);
        Ok(())
    }

    /// Steps 3-4: recompress the current content and keep it only if strictly smaller
    async fn recompress_in_place(&self, task: &ImageTask) -> Result<bool> {
        let name = task.display_name();
        let compressor = task.extension.compressor();

        let current = tokio::fs::read(&task.path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", task.path.display(), e))?;
        let current_size = current.len() as u64;

        let compressed = self
            .backend
            .compress(compressor, &current)
            .await
            .map_err(|e| anyhow::anyhow!("{} compression failed for {}: {}", compressor.label(), task.path.display(), e))?;
        let new_size = compressed.len() as u64;

        if compressed.is_empty() || new_size >= current_size {
            info!(
                "{}: no reduction, keeping original ({} -> {})",
                name,
                FileManager::format_size(current_size),
                FileManager::format_size(new_size)
            );
            return Ok(false);
        }

        let guard = TempFileGuard::new(&task.path);
        guard
            .write(&compressed)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", guard.temp_path().display(), e))?;
        guard
            .commit()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to replace {}: {}", task.path.display(), e))?;

        info!(
            "{}: {} {} -> {} ({:.2}% smaller)",
            name,
            compressor.label(),
            FileManager::format_size(current_size),
            FileManager::format_size(new_size),
            FileManager::calculate_reduction(current_size, new_size)
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Compressor;
    use crate::optimizer::path_resolver::PathResolver;
    use crate::optimizer::test_support::{fake_image, parse_fake, write_fake, FakeBackend};
    use std::path::Path;
    use tempfile::TempDir;

    fn optimizer(backend: FakeBackend) -> (TaskOptimizer, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        (TaskOptimizer::new(Config::default(), backend.clone()), backend)
    }

    fn task(path: &Path) -> ImageTask {
        ImageTask::from_path(path.to_path_buf()).unwrap()
    }

    fn on_disk(path: &Path) -> ImageMetadata {
        parse_fake(&std::fs::read(path).unwrap()).unwrap().0
    }

    #[tokio::test]
    async fn test_large_image_is_resized_then_recompressed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        write_fake(&path, 4000, 3000, 500_000);
        let (worker, backend) = optimizer(FakeBackend::default());

        let outcome = worker.process_single_file(&task(&path)).await.unwrap();

        assert_eq!(outcome.resized_to, Some(ImageMetadata { width: 2500, height: 1875 }));
        assert!(outcome.recompressed);
        assert!(outcome.final_size < 500_000);
        assert_eq!(on_disk(&path), ImageMetadata { width: 2500, height: 1875 });
        assert!(!PathResolver::temp_path(&path).exists());
        assert_eq!(
            backend.calls(),
            vec!["probe photo.jpg", "resize photo.jpg 2500x1875", "compress JPEG"]
        );
    }

    #[tokio::test]
    async fn test_small_image_skips_resize() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("icon.png");
        write_fake(&path, 100, 100, 2048);
        let (worker, backend) = optimizer(FakeBackend::default());

        let outcome = worker.process_single_file(&task(&path)).await.unwrap();

        assert_eq!(outcome.resized_to, None);
        assert!(outcome.recompressed);
        assert_eq!(outcome.final_size, 1024);
        assert_eq!(backend.calls(), vec!["probe icon.png", "compress PNG"]);
    }

    #[tokio::test]
    async fn test_no_reduction_keeps_file_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("icon.png");
        write_fake(&path, 100, 100, 2048);
        let before = std::fs::read(&path).unwrap();
        let (worker, _) = optimizer(FakeBackend {
            compress_grows: true,
            ..Default::default()
        });

        let outcome = worker.process_single_file(&task(&path)).await.unwrap();

        assert!(!outcome.recompressed);
        assert!(!outcome.changed());
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(outcome.final_size, outcome.original_size);
    }

    #[tokio::test]
    async fn test_equal_size_is_not_committed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("anim.gif");
        // already carries the optimized marker: the fake returns identical bytes
        std::fs::write(&path, fake_image(300, 200, 4096, true)).unwrap();
        let (worker, _) = optimizer(FakeBackend::default());

        let outcome = worker.process_single_file(&task(&path)).await.unwrap();
        assert!(!outcome.recompressed);
        assert_eq!(outcome.final_size, 4096);
    }

    #[tokio::test]
    async fn test_probe_failure_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"").unwrap();
        let (worker, backend) = optimizer(FakeBackend::default());

        let err = worker.process_single_file(&task(&path)).await.unwrap_err();

        assert!(err.to_string().contains("Probe failed"));
        assert!(err.to_string().contains("broken.jpg"));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
        assert_eq!(backend.calls(), vec!["probe broken.jpg"]);
    }

    #[tokio::test]
    async fn test_resize_failure_keeps_original_and_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.webp");
        write_fake(&path, 6000, 4000, 10_000);
        let before = std::fs::read(&path).unwrap();
        let (worker, backend) = optimizer(FakeBackend {
            fail_resize: true,
            ..Default::default()
        });

        let err = worker.process_single_file(&task(&path)).await.unwrap_err();

        assert!(err.to_string().contains("Resize failed"));
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(!PathResolver::temp_path(&path).exists());
        assert!(!backend.calls().iter().any(|c| c.starts_with("compress")));
    }

    #[tokio::test]
    async fn test_compression_failure_after_resize_keeps_resized_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("banner.png");
        write_fake(&path, 5000, 1000, 100_000);
        let (worker, _) = optimizer(FakeBackend {
            failing_compressors: [Compressor::Png].into_iter().collect(),
            ..Default::default()
        });

        let err = worker.process_single_file(&task(&path)).await.unwrap_err();

        assert!(err.to_string().contains("PNG compression failed"));
        let (meta, optimized) = parse_fake(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(meta, ImageMetadata { width: 2500, height: 500 });
        assert!(!optimized);
    }

    #[tokio::test]
    async fn test_exactly_max_width_is_not_resized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edge.svg");
        write_fake(&path, 2500, 10, 500);
        let (worker, backend) = optimizer(FakeBackend::default());

        let outcome = worker.process_single_file(&task(&path)).await.unwrap();
        assert_eq!(outcome.resized_to, None);
        assert_eq!(backend.calls(), vec!["probe edge.svg", "compress SVG"]);
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.JPEG");
        write_fake(&path, 4000, 3000, 50_000);
        let (worker, _) = optimizer(FakeBackend::default());

        worker.process_single_file(&task(&path)).await.unwrap();
        let after_first = std::fs::read(&path).unwrap();

        let second = worker.process_single_file(&task(&path)).await.unwrap();
        assert!(!second.changed());
        assert_eq!(std::fs::read(&path).unwrap(), after_first);
    }

    #[test]
    fn test_outcome_accounting() {
        let outcome = FileOutcome {
            path: PathBuf::from("a.jpg"),
            original_size: 1000,
            final_size: 250,
            dimensions: ImageMetadata { width: 10, height: 10 },
            resized_to: None,
            recompressed: true,
        };
        assert!(outcome.changed());
        assert_eq!(outcome.bytes_saved(), 750);
        assert_eq!(outcome.reduction_percent(), 75.0);
    }
}
