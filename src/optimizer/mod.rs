//! # Optimizer Module
//!
//! Separa le responsabilità in sottomoduli:
//! - `media_optimizer`: Orchestratore della run
//! - `task_optimizer`: Worker per il singolo file
//! - `progress_tracker`: `RunStats`, snapshot di progresso ed ETA
//! - `path_resolver`: Path temporanei e swap `<file>.temp` → `<file>`

pub mod media_optimizer;
pub mod task_optimizer;
pub mod progress_tracker;
pub mod path_resolver;

#[cfg(test)]
pub(crate) mod test_support;

pub use media_optimizer::{MediaOptimizer, RunReport};
pub use task_optimizer::{FileOutcome, TaskOptimizer};
pub use progress_tracker::{ProgressSnapshot, ProgressTracker, RunStats};
pub use path_resolver::{PathResolver, TempFileGuard};
