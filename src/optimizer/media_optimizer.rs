//! # Media Optimizer Main Orchestrator
//!
//! Orchestratore della run: discovery una sola volta, poi un file alla volta
//! attraverso `TaskOptimizer`, aggiornando `RunStats` dopo ogni file.
//!
//! ## Livelli di errore:
//! - Discovery della root fallita → `Err` da `run`, exit code non-zero
//! - Errore su un singolo file → log + contatore, la run continua
//!
//! I batch (`batch_size`) servono solo a raggruppare i log: l'esecuzione è sempre sequenziale.

use anyhow::Result;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::{
    config::Config,
    file_manager::FileManager,
    format::ImageTask,
    image_processor::{ExternalToolBackend, ImageBackend},
    json_output::JsonMessage,
    optimizer::{
        progress_tracker::{format_duration, ProgressTracker, RunStats},
        task_optimizer::TaskOptimizer,
    },
    progress::OptimizationStats,
};

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: OptimizationStats,
    pub run: RunStats,
    pub finished_at: DateTime<Local>,
}

/// Orchestratore principale
pub struct MediaOptimizer {
    root: PathBuf,
    config: Config,
    worker: TaskOptimizer,
}

impl MediaOptimizer {
    /// Crea l'ottimizzatore con i tool esterni di sistema
    pub fn new(root: &Path, config: Config) -> Result<Self> {
        let backend = Arc::new(ExternalToolBackend::new(config.clone()));
        Self::with_backend(root, config, backend)
    }

    pub fn with_backend(root: &Path, config: Config, backend: Arc<dyn ImageBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            root: root.to_path_buf(),
            worker: TaskOptimizer::new(config.clone(), backend),
            config,
        })
    }

    /// Esegue la run completa
    pub async fn run(&self) -> Result<RunReport> {
        let started_at = Local::now();
        let started = Instant::now();

        let tasks = FileManager::find_image_files(&self.root)?;
        let mut run = RunStats::starting_at(tasks.len(), started_at, started);

        self.emit_start_message(tasks.len(), started_at);

        if tasks.is_empty() {
            return Ok(self.handle_empty_directory(run));
        }

        self.worker.backend().report_capabilities().await;

        let tracker = ProgressTracker::new(tasks.len(), &self.config);
        let mut stats = OptimizationStats::new();
        let total = tasks.len();
        let batch_size = self.config.batch_size;
        let batch_count = total.div_ceil(batch_size);

        for (batch_index, batch) in tasks.chunks(batch_size).enumerate() {
            tracker.suspend(|| info!("Batch {}/{} ({} files)", batch_index + 1, batch_count, batch.len()));

            for (offset, task) in batch.iter().enumerate() {
                let index = batch_index * batch_size + offset;
                let message = self.process_task(task, index, total, &tracker, &mut stats).await;

                let (next, snapshot) = run.advance(Instant::now(), self.config.eta_min_samples);
                run = next;
                tracker.record(&snapshot, &message);
            }
        }

        let finished_at = Local::now();
        run.elapsed = started.elapsed();
        tracker.finish(&stats.format_summary());
        self.print_final_stats(&stats, &run, finished_at);

        Ok(RunReport {
            stats,
            run,
            finished_at,
        })
    }

    /// Per-file guard: any error stops at this file
    async fn process_task(
        &self,
        task: &ImageTask,
        index: usize,
        total: usize,
        tracker: &ProgressTracker,
        stats: &mut OptimizationStats,
    ) -> String {
        let name = task.display_name();
        let size = FileManager::file_size(&task.path).await.unwrap_or(0);
        tracker.file_started(task, size, index, total);
        debug!("Processing {} ({})", task.path.display(), FileManager::format_size(size));

        match self.worker.process_single_file(task).await {
            Ok(outcome) => {
                stats.add_outcome(&outcome);
                if self.config.json_output {
                    JsonMessage::file_complete(&outcome).emit();
                }
                if outcome.changed() {
                    format!("[OK] {}: {:.2}% smaller", name, outcome.reduction_percent())
                } else {
                    format!("[SKIP] {}: no reduction", name)
                }
            }
            Err(e) => {
                tracker.suspend(|| error!("Error processing {}: {:#}", task.path.display(), e));
                stats.add_error();
                if self.config.json_output {
                    let remaining = FileManager::file_size(&task.path).await.unwrap_or(0);
                    JsonMessage::file_failed(task.path.clone(), remaining, format!("{:#}", e)).emit();
                }
                format!("[ERROR] {}", name)
            }
        }
    }

    fn emit_start_message(&self, total_files: usize, started_at: DateTime<Local>) {
        if self.config.json_output {
            JsonMessage::start(self.root.clone(), total_files, started_at.to_rfc3339(), &self.config).emit();
        }
        info!("Starting image shrinking in: {}", self.root.display());
        info!(
            "Max width {}px | JPEG q{} | WebP q{} | PNG {}",
            self.config.max_width,
            self.config.jpeg_quality,
            self.config.webp_quality,
            self.config.png_quality_arg()
        );
        info!("Found {} image files to process", total_files);
    }

    fn handle_empty_directory(&self, mut run: RunStats) -> RunReport {
        let finished_at = Local::now();
        run.elapsed = run.started.elapsed();
        let stats = OptimizationStats::new();

        info!("No image files found under {}", self.root.display());
        if self.config.json_output {
            JsonMessage::complete(
                &stats,
                run.started_at.to_rfc3339(),
                finished_at.to_rfc3339(),
                run.elapsed.as_secs_f64(),
            )
            .emit();
        }

        RunReport {
            stats,
            run,
            finished_at,
        }
    }

    fn print_final_stats(&self, stats: &OptimizationStats, run: &RunStats, finished_at: DateTime<Local>) {
        info!("{}", stats.format_summary());
        info!(
            "Started {} | Finished {} | Elapsed {}",
            run.started_at.to_rfc3339(),
            finished_at.to_rfc3339(),
            format_duration(run.elapsed)
        );

        if self.config.json_output {
            JsonMessage::complete(
                stats,
                run.started_at.to_rfc3339(),
                finished_at.to_rfc3339(),
                run.elapsed.as_secs_f64(),
            )
            .emit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptimizeError;
    use crate::format::{Compressor, ImageMetadata};
    use crate::optimizer::test_support::{parse_fake, write_fake, FakeBackend};
    use tempfile::TempDir;
    use walkdir::WalkDir;

    fn optimizer(root: &Path, config: Config, backend: FakeBackend) -> MediaOptimizer {
        let backend: Arc<dyn ImageBackend> = Arc::new(backend);
        MediaOptimizer::with_backend(root, config, backend).unwrap()
    }

    fn dims(path: &Path) -> ImageMetadata {
        parse_fake(&std::fs::read(path).unwrap()).unwrap().0
    }

    fn leftover_temps(root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.to_string_lossy().ends_with(".temp"))
            .collect()
    }

    fn snapshot_tree(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut files: Vec<_> = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| (e.path().to_path_buf(), std::fs::read(e.path()).unwrap()))
            .collect();
        files.sort();
        files
    }

    #[tokio::test]
    async fn test_photo_icon_broken_scenario() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_fake(&root.join("photo.jpg"), 4000, 3000, 500_000);
        write_fake(&root.join("icon.png"), 100, 100, 2048);
        std::fs::write(root.join("broken.jpg"), b"").unwrap();

        let report = optimizer(root, Config::default(), FakeBackend::default())
            .run()
            .await
            .unwrap();

        assert_eq!(report.run.processed, 3);
        assert_eq!(report.run.total, 3);
        assert!(report.run.is_complete());
        assert_eq!(report.stats.errors, 1);
        assert_eq!(report.stats.files_resized, 1);

        let photo = root.join("photo.jpg");
        assert_eq!(dims(&photo), ImageMetadata { width: 2500, height: 1875 });
        assert!(std::fs::metadata(&photo).unwrap().len() < 500_000);

        let icon = root.join("icon.png");
        assert_eq!(dims(&icon), ImageMetadata { width: 100, height: 100 });
        assert!(std::fs::metadata(&icon).unwrap().len() <= 2048);

        assert_eq!(std::fs::metadata(root.join("broken.jpg")).unwrap().len(), 0);
        assert!(leftover_temps(root).is_empty());
    }

    #[tokio::test]
    async fn test_one_corrupt_file_is_isolated() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for name in ["a.jpg", "b.png", "c.gif", "nested/d.webp"] {
            write_fake(&root.join(name), 800, 600, 4096);
        }
        std::fs::write(root.join("nested/corrupt.jpeg"), b"\xff\xd8 truncated").unwrap();

        let report = optimizer(root, Config::default(), FakeBackend::default())
            .run()
            .await
            .unwrap();

        assert_eq!(report.stats.files_processed, 5);
        assert_eq!(report.stats.errors, 1);
        assert_eq!(report.stats.files_optimized, 4);
        assert_eq!(
            std::fs::read(root.join("nested/corrupt.jpeg")).unwrap(),
            b"\xff\xd8 truncated"
        );
    }

    #[tokio::test]
    async fn test_second_run_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_fake(&root.join("wide.jpg"), 5000, 2000, 100_000);
        write_fake(&root.join("small/logo.svg"), 300, 300, 1500);

        let shrinker = optimizer(root, Config::default(), FakeBackend::default());
        let first = tokio_test::assert_ok!(shrinker.run().await);
        assert_eq!(first.stats.files_optimized, 2);
        let after_first = snapshot_tree(root);

        let second = tokio_test::assert_ok!(shrinker.run().await);
        assert_eq!(second.stats.files_optimized, 0);
        assert_eq!(second.stats.files_unchanged, 2);
        assert_eq!(second.stats.total_bytes_saved, 0);
        assert_eq!(snapshot_tree(root), after_first);
    }

    #[tokio::test]
    async fn test_compressor_failure_counts_one_error() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_fake(&root.join("anim.gif"), 400, 400, 4096);
        write_fake(&root.join("shot.webp"), 400, 400, 4096);
        let before = std::fs::read(root.join("anim.gif")).unwrap();

        let backend = FakeBackend {
            failing_compressors: [Compressor::Gif].into_iter().collect(),
            ..Default::default()
        };
        let report = optimizer(root, Config::default(), backend).run().await.unwrap();

        assert_eq!(report.stats.errors, 1);
        assert_eq!(report.stats.files_optimized, 1);
        assert_eq!(std::fs::read(root.join("anim.gif")).unwrap(), before);
    }

    #[tokio::test]
    async fn test_batch_size_only_groups_logs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for i in 0..7 {
            write_fake(&root.join(format!("img{}.png", i)), 3000, 1000, 9000);
        }
        let config = Config {
            batch_size: 3,
            ..Default::default()
        };

        let report = optimizer(root, config, FakeBackend::default()).run().await.unwrap();

        assert_eq!(report.run.processed, 7);
        assert_eq!(report.stats.files_resized, 7);
        for i in 0..7 {
            assert_eq!(
                dims(&root.join(format!("img{}.png", i))),
                ImageMetadata { width: 2500, height: 833 }
            );
        }
    }

    #[tokio::test]
    async fn test_huge_batch_size_is_one_batch() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_fake(&root.join("a.png"), 3000, 1000, 9000);
        write_fake(&root.join("b.png"), 300, 100, 900);
        let config = Config {
            batch_size: usize::MAX,
            ..Default::default()
        };

        let report = optimizer(root, config, FakeBackend::default()).run().await.unwrap();

        assert_eq!(report.run.processed, 2);
        assert_eq!(report.stats.errors, 0);
    }

    #[tokio::test]
    async fn test_empty_tree_completes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"no images here").unwrap();
        let backend = Arc::new(FakeBackend::default());
        let shrinker = MediaOptimizer::with_backend(dir.path(), Config::default(), backend.clone()).unwrap();

        let report = shrinker.run().await.unwrap();

        assert_eq!(report.run.total, 0);
        assert_eq!(report.stats, OptimizationStats::new());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let shrinker = optimizer(&dir.path().join("gone"), Config::default(), FakeBackend::default());

        let err = shrinker.run().await.unwrap_err();
        let typed = err.downcast_ref::<OptimizeError>().unwrap();
        assert!(typed.is_fatal());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let backend: Arc<dyn ImageBackend> = Arc::new(FakeBackend::default());
        let config = Config {
            batch_size: 0,
            ..Default::default()
        };
        assert!(MediaOptimizer::with_backend(dir.path(), config, backend).is_err());
    }
}
