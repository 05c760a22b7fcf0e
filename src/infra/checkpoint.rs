// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Makes training resumable across process restarts.
//
// What lives in the checkpoint directory:
//   checkpoints/
//     epoch_0000.params   ← parameter snapshot after epoch 0
//     epoch_0010.params   ← parameter snapshot after epoch 10
//     ...
//     train_config.json   ← hyperparameters of the run
//     metrics.csv         ← written by MetricsLogger
//
// The .params files are opaque byte blobs produced by the model
// (see domain::traits::ParameterSnapshot). This module only
// names, discovers, writes and reads them.
//
// Discovery:
//   every file ending in ".params" must match the naming
//   convention exactly; the highest epoch wins, ties broken by
//   path so the result never depends on directory order.
//
// Saving:
//   write into a temp file in the same directory, fsync, then
//   rename over the final name. A crash leaves either the old
//   state or the complete new file, never a torn .params file.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::domain::checkpoint_name::{
    format_checkpoint_name, has_checkpoint_suffix, parse_checkpoint_name, MAX_EPOCH,
};

/// Name of the hyperparameter file saved next to the checkpoints
pub const CONFIG_FILE: &str = "train_config.json";

/// Errors raised while discovering, writing or reading checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("malformed checkpoint name {path}: expected epoch_NNNN.params")]
    MalformedCheckpointName { path: PathBuf },

    #[error("epoch {epoch} cannot be named as a checkpoint (max {max})", max = MAX_EPOCH)]
    EpochOutOfRange { epoch: usize },

    #[error("checkpoint io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CheckpointError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A checkpoint file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub epoch: usize,
    pub path: PathBuf,
}

/// Manages saving and discovery of parameter snapshots.
/// All files are stored in the configured directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    /// Path to the directory where checkpoints are stored
    dir: PathBuf,
}

impl CheckpointManager {
    /// Point a manager at a directory. Nothing is created on disk.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the checkpoint directory (like `mkdir -p`).
    pub fn ensure_dir(&self) -> Result<(), CheckpointError> {
        fs::create_dir_all(&self.dir).map_err(|e| CheckpointError::io(&self.dir, e))
    }

    /// Path a checkpoint for `epoch` is written to.
    pub fn path_for(&self, epoch: usize) -> Result<PathBuf, CheckpointError> {
        let name = format_checkpoint_name(epoch).ok_or(CheckpointError::EpochOutOfRange { epoch })?;
        Ok(self.dir.join(name))
    }

    /// Find the checkpoint with the highest epoch.
    ///
    /// Returns `Ok(None)` when the directory holds no `.params`
    /// files (or does not exist yet). That is the cold-start case.
    pub fn find_latest(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Checkpoint directory '{}' does not exist yet", self.dir.display());
                return Ok(None);
            }
            Err(e) => return Err(CheckpointError::io(&self.dir, e)),
        };

        let mut latest: Option<Checkpoint> = None;

        for entry in entries {
            let entry = entry.map_err(|e| CheckpointError::io(&self.dir, e))?;
            let path = entry.path();

            let file_type = entry.file_type().map_err(|e| CheckpointError::io(&path, e))?;
            if !file_type.is_file() {
                continue;
            }

            // Lossy: a non-UTF-8 name can never match the ASCII pattern
            let name = entry.file_name().to_string_lossy().into_owned();
            if !has_checkpoint_suffix(&name) {
                continue;
            }

            let epoch = parse_checkpoint_name(&name)
                .ok_or_else(|| CheckpointError::MalformedCheckpointName { path: path.clone() })?;
            let candidate = Checkpoint { epoch, path };

            let newer = match &latest {
                None => true,
                Some(best) => (candidate.epoch, &candidate.path) > (best.epoch, &best.path),
            };
            if newer {
                latest = Some(candidate);
            }
        }

        if let Some(ckpt) = &latest {
            tracing::debug!("Latest checkpoint: epoch {} at '{}'", ckpt.epoch, ckpt.path.display());
        }
        Ok(latest)
    }

    /// Persist a parameter snapshot for `epoch`.
    ///
    /// The directory must already exist and be writable; errors
    /// are returned, never swallowed.
    pub fn save(&self, epoch: usize, snapshot: &[u8]) -> Result<PathBuf, CheckpointError> {
        let path = self.path_for(epoch)?;

        // NamedTempFile names start with ".tmp" and carry no suffix,
        // so a leftover temp file is never mistaken for a checkpoint.
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| CheckpointError::io(&self.dir, e))?;
        tmp.write_all(snapshot)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| CheckpointError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| CheckpointError::io(&path, e.error))?;
        sync_dir(&self.dir).map_err(|e| CheckpointError::io(&self.dir, e))?;

        tracing::debug!("Saved checkpoint: epoch {} ({} bytes)", epoch, snapshot.len());
        Ok(path)
    }

    /// Read the snapshot bytes of a discovered checkpoint.
    pub fn load(&self, checkpoint: &Checkpoint) -> Result<Vec<u8>, CheckpointError> {
        fs::read(&checkpoint.path).map_err(|e| CheckpointError::io(&checkpoint.path, e))
    }

    /// Save the training configuration to JSON.
    pub fn save_config<C: Serialize>(&self, cfg: &C) -> anyhow::Result<PathBuf> {
        let path = self.dir.join(CONFIG_FILE);

        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(path)
    }
}

/// Flush the directory entry so a completed rename survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
