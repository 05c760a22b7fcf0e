// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Read the class list           (Layer 4 - data)
//   Step 2: Index the train split         (Layer 4 - data)
//   Step 3: Index the val split, if asked (Layer 4 - data)
//   Step 4: Prepare checkpoint directory  (Layer 6 - infra)
//   Step 5: Save config                   (Layer 6 - infra)
//   Step 6: Open the metrics log          (Layer 6 - infra)
//   Step 7: Run training loop             (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::VocSegmentation,
    loader::load_class_registry,
    preprocessor::SegTransform,
};
use crate::domain::traits::SampleSource;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    backbone::BackboneKind,
    trainer::{run_training, TrainSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run, built once from the
// command line and passed by reference from here on.
// Saved as train_config.json next to the checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub classes:             String,
    pub dataset_root:        String,
    pub checkpoint_dir:      String,
    pub batch_size:          usize,
    pub lr:                  f64,
    pub weight_decay:        f64,
    pub momentum:            f64,
    pub epochs:              usize,
    pub save_every:          usize,
    pub backbone:            BackboneKind,
    /// Stem width of the ResNet; 64 is the standard network
    pub base_width:          usize,
    pub height:              u32,
    pub width:               u32,
    pub aux_weight:          f64,
    pub num_workers:         usize,
    pub seed:                u64,
    pub validate:            bool,
    pub pretrained_backbone: Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            classes:             "./".to_string(),
            dataset_root:        "./".to_string(),
            checkpoint_dir:      "./".to_string(),
            batch_size:          12,
            lr:                  0.001,
            weight_decay:        0.0001,
            momentum:            0.9,
            epochs:              50,
            save_every:          10,
            backbone:            BackboneKind::Resnet101,
            base_width:          64,
            height:              256,
            width:               256,
            aux_weight:          0.2,
            num_workers:         4,
            seed:                42,
            validate:            false,
            pretrained_backbone: None,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Class list ───────────────────────────────────────────────
        // Its length fixes the number of output channels
        let classes = load_class_registry(&cfg.classes)?;
        tracing::info!("Loaded {} classes from '{}'", classes.len(), cfg.classes);

        // ── Step 2: Training split ───────────────────────────────────────────
        let transform = SegTransform::new(cfg.height, cfg.width);
        let train_ds = VocSegmentation::new(&cfg.dataset_root, "train", classes.len(), transform)
            .with_context(|| format!("Cannot index training data under '{}'", cfg.dataset_root))?;

        // ── Step 3: Validation split ─────────────────────────────────────────
        let val_ds = if cfg.validate {
            let ds = VocSegmentation::new(&cfg.dataset_root, "val", classes.len(), transform)
                .with_context(|| format!("Cannot index validation data under '{}'", cfg.dataset_root))?;
            Some(ds)
        } else {
            None
        };
        tracing::info!(
            "Dataset: {} train, {} validation",
            train_ds.sample_count(),
            val_ds.as_ref().map_or(0, |ds| ds.sample_count())
        );

        // ── Step 4 + 5: Checkpoint directory and config ──────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.ensure_dir()?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 6: Metrics log ──────────────────────────────────────────────
        let metrics = MetricsLogger::new(ckpt_manager.dir())?;

        // ── Step 7: Run training loop (Layer 5) ──────────────────────────────
        run_training(cfg, &classes, train_ds, val_ds, &ckpt_manager, &metrics)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::write_voc;

    #[test]
    fn test_config_json_round_trip() {
        let cfg = TrainConfig { pretrained_backbone: Some("r101.bin".into()), ..TrainConfig::default() };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"backbone\":\"resnet101\""));

        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.epochs, 50);
        assert_eq!(back.pretrained_backbone.as_deref(), Some("r101.bin"));
    }

    #[test]
    fn test_missing_class_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            classes:        tmp.path().join("nope.txt").display().to_string(),
            checkpoint_dir: tmp.path().join("ckpt").display().to_string(),
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
        assert!(!tmp.path().join("ckpt").exists());
    }

    #[test]
    fn test_missing_val_split_fails() {
        let tmp = tempfile::tempdir().unwrap();
        write_voc(tmp.path(), "train", &["a"]);
        std::fs::write(tmp.path().join("classes.txt"), "bg\nfg\n").unwrap();

        let cfg = TrainConfig {
            classes:        tmp.path().join("classes.txt").display().to_string(),
            dataset_root:   tmp.path().display().to_string(),
            checkpoint_dir: tmp.path().join("ckpt").display().to_string(),
            validate:       true,
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(format!("{err:#}").contains("validation"));
    }

    #[test]
    fn test_completed_run_writes_config_only() {
        let tmp = tempfile::tempdir().unwrap();
        write_voc(tmp.path(), "train", &["a"]);
        std::fs::write(tmp.path().join("classes.txt"), "bg\nfg\n").unwrap();

        let ckpt_dir = tmp.path().join("ckpt");
        let ckpt = CheckpointManager::new(&ckpt_dir);
        ckpt.ensure_dir().unwrap();
        ckpt.save(1, b"opaque").unwrap();

        let cfg = TrainConfig {
            classes:        tmp.path().join("classes.txt").display().to_string(),
            dataset_root:   tmp.path().display().to_string(),
            checkpoint_dir: ckpt_dir.display().to_string(),
            epochs:         2,
            height:         8,
            width:          8,
            ..TrainConfig::default()
        };
        let summary = TrainUseCase::new(cfg).execute().unwrap();
        assert_eq!(summary.epochs_run, 0);
        assert!(ckpt_dir.join(crate::infra::checkpoint::CONFIG_FILE).exists());
        assert!(ckpt_dir.join(crate::infra::metrics::METRICS_FILE).exists());
    }
}
