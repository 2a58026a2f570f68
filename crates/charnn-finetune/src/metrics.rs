//! Fine-tuning metrics logging and run report

use crate::train::{EpochCallbacks, EpochRecord, LossHistory};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Metrics logger for fine-tuning
///
/// Logs the step loss every `log_interval` steps and times every epoch.
pub struct MetricsLogger {
    log_interval: usize,
    step: usize,
    epoch_started: Option<Instant>,
    epoch_seconds: Vec<f64>,
}

impl MetricsLogger {
    /// Create a new metrics logger; a `log_interval` of 0 disables step logging
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval,
            step: 0,
            epoch_started: None,
            epoch_seconds: Vec::new(),
        }
    }

    /// Get current step number
    pub fn step(&self) -> usize {
        self.step
    }

    /// Wall-clock seconds of every timed epoch
    pub fn epoch_seconds(&self) -> &[f64] {
        &self.epoch_seconds
    }

    /// Mean epoch duration in seconds, 0 before any epoch completed
    pub fn avg_epoch_seconds(&self) -> f64 {
        if self.epoch_seconds.is_empty() {
            0.0
        } else {
            self.epoch_seconds.iter().sum::<f64>() / self.epoch_seconds.len() as f64
        }
    }
}

impl EpochCallbacks for MetricsLogger {
    fn on_epoch_begin(&mut self, _epoch: usize) {
        self.epoch_started = Some(Instant::now());
    }

    fn on_step_end(&mut self, epoch: usize, step: usize, loss: f32) {
        self.step = step;
        if self.log_interval > 0 && step % self.log_interval == 0 {
            info!("Step {}: epoch={}, loss={:.6}", step, epoch, loss);
        }
    }

    fn on_epoch_end(&mut self, record: &EpochRecord) {
        if let Some(started) = self.epoch_started.take() {
            let seconds = started.elapsed().as_secs_f64();
            self.epoch_seconds.push(seconds);
            info!("Epoch {} took {:.2}s", record.epoch, seconds);
        }
    }
}

/// Summary of one fine-tune run, written next to the checkpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineTuneReport {
    /// Corpus identifier the model was tuned on
    pub corpus: String,
    /// Per-epoch losses
    pub history: LossHistory,
    /// Epoch with the lowest validation loss
    pub best_epoch: Option<usize>,
    /// Mean wall-clock seconds per epoch
    pub avg_epoch_seconds: f64,
    /// Timestamp of the run
    pub timestamp: String,
}

impl FineTuneReport {
    /// Generate a report from a finished run
    pub fn generate_report(corpus: &str, history: &LossHistory, avg_epoch_seconds: f64) -> Self {
        Self {
            corpus: corpus.to_string(),
            history: history.clone(),
            best_epoch: history.best_validation().map(|r| r.epoch),
            avg_epoch_seconds,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Format report as markdown
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str(&format!("# Fine-tune Report: {}\n\n", self.corpus));
        md.push_str(&format!("**Timestamp**: {}\n\n", self.timestamp));
        md.push_str(&format!(
            "**Average epoch time**: {:.2}s\n\n",
            self.avg_epoch_seconds
        ));
        if let Some(best) = self.best_epoch {
            md.push_str(&format!("**Best validation epoch**: {}\n\n", best));
        }
        md.push_str("| Epoch | Training loss | Validation loss |\n");
        md.push_str("|-------|---------------|-----------------|\n");
        for record in self.history.records() {
            md.push_str(&format!(
                "| {} | {:.4} | {:.4} |\n",
                record.epoch, record.train_loss, record.val_loss
            ));
        }
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avg_epoch_seconds_empty() {
        assert_eq!(MetricsLogger::new(10).avg_epoch_seconds(), 0.0);
    }

    #[test]
    fn test_epoch_end_without_begin_is_not_timed() {
        let mut logger = MetricsLogger::new(0);
        logger.on_epoch_end(&EpochRecord {
            epoch: 1,
            train_loss: 1.0,
            val_loss: 1.0,
        });
        assert!(logger.epoch_seconds().is_empty());
    }

    #[test]
    fn test_report_markdown() {
        let mut history = LossHistory::new();
        history.push(EpochRecord {
            epoch: 1,
            train_loss: 2.0,
            val_loss: 2.5,
        });
        history.push(EpochRecord {
            epoch: 2,
            train_loss: 1.5,
            val_loss: 2.25,
        });

        let report = FineTuneReport::generate_report("someone", &history, 1.5);
        assert_eq!(report.best_epoch, Some(2));

        let md = report.to_markdown();
        assert!(md.contains("# Fine-tune Report: someone"));
        assert!(md.contains("| 2 | 1.5000 | 2.2500 |"));
    }
}
