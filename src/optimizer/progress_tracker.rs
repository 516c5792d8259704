//! # Progress Tracking Module
//!
//! Stato della run come valore esplicito: `RunStats` entra nello step function
//! `advance` e ne esce aggiornato insieme a una `ProgressSnapshot`, senza stato globale.
//! `ProgressTracker` si limita a mostrare gli snapshot (progress bar, log, eventi JSON).

use chrono::{DateTime, Local};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

use crate::{
    config::Config,
    format::ImageTask,
    json_output::JsonMessage,
    progress::ProgressManager,
};

/// Counters and timing of one run
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Wall-clock start, for the summary
    pub started_at: DateTime<Local>,
    /// Monotonic start, for elapsed/ETA
    pub started: Instant,
    pub processed: usize,
    pub total: usize,
    pub elapsed: Duration,
}

/// Progress after one more file
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub percent: u32,
    pub elapsed: Duration,
    pub eta: Option<Duration>,
}

impl RunStats {
    pub fn starting_at(total: usize, started_at: DateTime<Local>, started: Instant) -> Self {
        Self {
            started_at,
            started,
            processed: 0,
            total,
            elapsed: Duration::ZERO,
        }
    }

    /// Count one finished file (successful or not) at time `now`.
    ///
    /// The ETA is a linear extrapolation and is only given once more than
    /// `eta_min_samples` files are done and the percentage is non-zero.
    pub fn advance(self, now: Instant, eta_min_samples: usize) -> (RunStats, ProgressSnapshot) {
        let processed = self.processed + 1;
        let elapsed = now.saturating_duration_since(self.started);

        let percent = if self.total == 0 {
            0
        } else {
            ((processed as f64 / self.total as f64) * 100.0).round() as u32
        };

        let eta = if processed > eta_min_samples && percent > 0 {
            let remaining = self.total.saturating_sub(processed);
            let avg_ms = elapsed.as_millis() as f64 / processed as f64;
            Some(Duration::from_millis((avg_ms * remaining as f64).round() as u64))
        } else {
            None
        };

        let snapshot = ProgressSnapshot {
            completed: processed,
            total: self.total,
            percent,
            elapsed,
            eta,
        };

        (
            RunStats {
                processed,
                elapsed,
                ..self
            },
            snapshot,
        )
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.completed, self.total, self.percent)
    }
}

/// `HH:MM:SS`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// `k/n (p%) | elapsed HH:MM:SS [| ETA HH:MM:SS]`
pub fn progress_line(snapshot: &ProgressSnapshot) -> String {
    match snapshot.eta {
        Some(eta) => format!(
            "{} | elapsed {} | ETA {}",
            snapshot,
            format_duration(snapshot.elapsed),
            format_duration(eta)
        ),
        None => format!("{} | elapsed {}", snapshot, format_duration(snapshot.elapsed)),
    }
}

/// Presents progress: bar in interactive mode, JSON events with `--json`, log lines always
pub struct ProgressTracker {
    bar: ProgressManager,
    json_output: bool,
}

impl ProgressTracker {
    pub fn new(total_files: usize, config: &Config) -> Self {
        let bar = if config.json_output {
            ProgressManager::hidden(total_files as u64)
        } else {
            ProgressManager::new(total_files as u64)
        };
        Self {
            bar,
            json_output: config.json_output,
        }
    }

    pub fn file_started(&self, task: &ImageTask, size: u64, index: usize, total: usize) {
        self.bar.set_message(&task.display_name());
        if self.json_output {
            JsonMessage::file_start(task.path.clone(), size, index, total).emit();
        }
    }

    /// Log and show one snapshot
    pub fn record(&self, snapshot: &ProgressSnapshot, message: &str) {
        self.bar.update(message);
        self.suspend(|| info!("Progress: {}", progress_line(snapshot)));

        if self.json_output {
            JsonMessage::progress(snapshot).emit();
        }
    }

    /// Log through here while the bar is on screen
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn finish(&self, summary: &str) {
        self.bar.finish(summary);
    }
}
