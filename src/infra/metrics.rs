// ============================================================
// Layer 6 — Metrics & Run Report
// ============================================================
// Per-epoch training metrics, held-out evaluation metrics and
// the optional JSON run report written with `--report`.
//
// Example report:
//   {
//     "program": "digit_cnn",
//     "total_params": 402442,
//     "seed": 42,
//     "epochs": [
//       { "epoch": 1, "loss": 0.29, "accuracy": 0.91,
//         "val_loss": 0.11, "val_accuracy": 0.97 },
//       ...
//     ],
//     "test": { "loss": 0.08, "accuracy": 0.975 }
//   }

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path};

/// Loss and accuracy over one dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    /// Sample-weighted mean loss, NaN for an empty dataset
    pub loss:     f64,
    /// Fraction of samples classified correctly, in [0, 1]
    pub accuracy: f64,
}

impl EvalMetrics {
    pub fn new(loss: f64, accuracy: f64) -> Self {
        Self { loss, accuracy }
    }

    /// Metrics of a dataset with no samples
    pub fn empty() -> Self {
        Self { loss: f64::NAN, accuracy: 0.0 }
    }
}

/// Running, sample-weighted totals over batches
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsAccumulator {
    loss_sum: f64,
    correct:  usize,
    samples:  usize,
}

impl MetricsAccumulator {
    /// Record one batch: its mean loss, correct predictions and size
    pub fn add(&mut self, batch_loss: f64, correct: usize, batch_size: usize) {
        self.loss_sum += batch_loss * batch_size as f64;
        self.correct  += correct;
        self.samples  += batch_size;
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn finish(&self) -> EvalMetrics {
        if self.samples == 0 {
            return EvalMetrics::empty();
        }
        EvalMetrics::new(
            self.loss_sum / self.samples as f64,
            self.correct as f64 / self.samples as f64,
        )
    }
}

/// One row of training history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Starts at 1
    pub epoch:        usize,
    pub loss:         f64,
    pub accuracy:     f64,
    pub val_loss:     Option<f64>,
    pub val_accuracy: Option<f64>,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train: EvalMetrics, valid: Option<EvalMetrics>) -> Self {
        Self {
            epoch,
            loss:         train.loss,
            accuracy:     train.accuracy,
            val_loss:     valid.map(|v| v.loss),
            val_accuracy: valid.map(|v| v.accuracy),
        }
    }
}

/// Formats like a Keras progress line, without the progress bar
pub struct EpochLine<'a> {
    pub metrics: &'a EpochMetrics,
    pub epochs:  usize,
}

impl fmt::Display for EpochLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.metrics;
        write!(
            f,
            "Epoch {}/{} - loss: {:.4} - accuracy: {:.4}",
            m.epoch, self.epochs, m.loss, m.accuracy
        )?;
        if let (Some(loss), Some(acc)) = (m.val_loss, m.val_accuracy) {
            write!(f, " - val_loss: {loss:.4} - val_accuracy: {acc:.4}")?;
        }
        Ok(())
    }
}

/// Everything a run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub program:      String,
    pub total_params: usize,
    pub seed:         u64,
    pub epochs:       Vec<EpochMetrics>,
    /// None when the dataset has no test split
    pub test:         Option<EvalMetrics>,
}

impl RunReport {
    /// Write the report as pretty-printed JSON, creating parent dirs.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating report directory '{}'", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("writing run report '{}'", path.display()))?;
        tracing::info!("Run report written to '{}'", path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_weights_by_batch_size() {
        let mut acc = MetricsAccumulator::default();
        acc.add(1.0, 3, 4);
        acc.add(4.0, 0, 1);
        let m = acc.finish();
        assert!((m.loss - 8.0 / 5.0).abs() < 1e-12);
        assert!((m.accuracy - 0.6).abs() < 1e-12);
        assert_eq!(acc.samples(), 5);
    }

    #[test]
    fn test_empty_accumulator() {
        let m = MetricsAccumulator::default().finish();
        assert!(m.loss.is_nan());
        assert_eq!(m.accuracy, 0.0);
    }

    #[test]
    fn test_epoch_line_with_and_without_validation() {
        let train = EvalMetrics::new(0.5, 0.8);
        let plain = EpochMetrics::new(1, train, None);
        assert_eq!(
            EpochLine { metrics: &plain, epochs: 2 }.to_string(),
            "Epoch 1/2 - loss: 0.5000 - accuracy: 0.8000"
        );

        let full = EpochMetrics::new(2, train, Some(EvalMetrics::new(0.25, 0.9)));
        assert_eq!(
            EpochLine { metrics: &full, epochs: 2 }.to_string(),
            "Epoch 2/2 - loss: 0.5000 - accuracy: 0.8000 - val_loss: 0.2500 - val_accuracy: 0.9000"
        );
    }

    #[test]
    fn test_report_written_as_json() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        let report = RunReport {
            program:      "digit_cnn".into(),
            total_params: 402_442,
            seed:         7,
            epochs:       vec![EpochMetrics::new(1, EvalMetrics::new(0.3, 0.9), None)],
            test:         Some(EvalMetrics::new(0.1, 0.97)),
        };
        report.write_json(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: RunReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back, report);
        assert!(text.contains("\"total_params\": 402442"));
    }
}
