// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (0-based, same as checkpoints)
//   - train_loss: running-average composite loss of the epoch
//   - pix_acc:    validation pixel accuracy  (empty if not run)
//   - miou:       validation mean IoU        (empty if not run)
//   - lr:         learning rate at the last iteration of the epoch
//
// Output file: <checkpoint_dir>/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,pix_acc,miou,lr
//   0,1.873200,0.701300,0.213400,0.000982
//   1,1.412000,,,0.000964
//
// The file is appended to, so a resumed run continues the same log.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// Name of the CSV file inside the checkpoint directory
pub const METRICS_FILE: &str = "metrics.csv";

const HEADER: &str = "epoch,train_loss,pix_acc,miou,lr";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,

    /// Running average of the composite loss over the epoch's batches
    pub train_loss: f64,

    /// Fraction of labelled pixels predicted correctly, if validated
    pub pix_acc: Option<f64>,

    /// Mean intersection-over-union, if validated
    pub miou: Option<f64>,

    pub lr: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, lr: f64) -> Self {
        Self { epoch, train_loss, pix_acc: None, miou: None, lr }
    }

    /// Attach validation results
    pub fn with_validation(mut self, pix_acc: f64, miou: f64) -> Self {
        self.pix_acc = Some(pix_acc);
        self.miou    = Some(miou);
        self
    }

    fn csv_row(&self) -> String {
        let opt = |v: Option<f64>| v.map(|x| format!("{x:.6}")).unwrap_or_default();
        format!(
            "{},{:.6},{},{},{:.6}",
            self.epoch,
            self.train_loss,
            opt(self.pix_acc),
            opt(self.miou),
            self.lr,
        )
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger in an existing directory.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let csv_path = dir.as_ref().join(METRICS_FILE);

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{}", m.csv_row())?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, lr={:.6}",
            m.epoch,
            m.train_loss,
            m.lr,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
