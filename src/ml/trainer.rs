// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Resumable train (+ optional validation) loop using Burn's
// DataLoader and SGD with a poly learning-rate schedule.
//
//   1. find the latest epoch_NNNN.params → start_epoch
//   2. build model, restore parameters when resuming
//   3. for epoch in start_epoch..epochs:
//        batches → forward → composite loss → backward → SGD step
//        optional validation (pixAcc, mIoU) on the inner backend
//        metrics.csv row, checkpoint when the schedule says so
//
// Key Burn insight:
//   - Training uses TrainBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on ValidBackend (Wgpu)
//   - The validation batcher must also use ValidBackend
//
// Reference: Burn Book §5, Long et al. (2015) FCN

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::path::{Path, PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::SegBatcher, dataset::VocSegmentation};
use crate::domain::{class_registry::ClassRegistry, traits::{ParameterSnapshot, SampleSource}};
use crate::infra::{
    checkpoint::{Checkpoint, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    evaluator::evaluate,
    loss::SegLoss,
    model::{FcnConfig, FcnModel},
    scheduler::PolyLr,
};

#[cfg(feature = "wgpu")]
pub type ValidBackend = burn::backend::Wgpu;
#[cfg(not(feature = "wgpu"))]
pub type ValidBackend = burn::backend::NdArray;

pub type TrainBackend = burn::backend::Autodiff<ValidBackend>;

/// What a call to the training loop did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainSummary {
    pub start_epoch:     usize,
    pub epochs_run:      usize,
    pub last_checkpoint: Option<PathBuf>,
}

/// Save every `save_every` epochs, and always after the last one.
pub fn should_save(epoch: usize, epochs: usize, save_every: usize) -> bool {
    let periodic = save_every > 0 && epoch % save_every == 0;
    periodic || epoch + 1 == epochs
}

/// First epoch to run given the newest checkpoint on disk.
pub fn start_epoch(latest: Option<&Checkpoint>) -> usize {
    latest.map_or(0, |c| c.epoch + 1)
}

pub fn run_training(
    cfg:          &TrainConfig,
    classes:      &ClassRegistry,
    train_ds:     VocSegmentation,
    val_ds:       Option<VocSegmentation>,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
) -> Result<TrainSummary> {
    let device = <TrainBackend as Backend>::Device::default();
    tracing::info!("Using device: {:?}", device);
    train_loop::<TrainBackend>(cfg, classes, train_ds, val_ds, ckpt_manager, metrics, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    classes:      &ClassRegistry,
    train_ds:     VocSegmentation,
    val_ds:       Option<VocSegmentation>,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
    device:       B::Device,
) -> Result<TrainSummary> {

    // ── Resume point ──────────────────────────────────────────────────────────
    let latest = ckpt_manager.find_latest()?;
    let start  = start_epoch(latest.as_ref());
    match &latest {
        Some(c) => tracing::info!("Found checkpoint {} (epoch {})", c.path.display(), c.epoch),
        None    => tracing::info!("No checkpoint in '{}', starting from scratch", ckpt_manager.dir().display()),
    }

    if start >= cfg.epochs {
        tracing::info!("Training already complete: {} of {} epochs done", start, cfg.epochs);
        return Ok(TrainSummary { start_epoch: start, epochs_run: 0, last_checkpoint: None });
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = FcnConfig::new(cfg.backbone, classes.len()).with_base_width(cfg.base_width);
    let mut model: FcnModel<B> = model_cfg.init(&device);

    match &latest {
        Some(ckpt) => {
            let bytes = ckpt_manager.load(ckpt)?;
            model = model.restore(&bytes, &device)?;
            tracing::info!("Resumed parameters from epoch {}", ckpt.epoch);
        }
        None => {
            if let Some(path) = &cfg.pretrained_backbone {
                model = model.with_pretrained_backbone(Path::new(path), &device)?;
            }
        }
    }
    tracing::info!(
        "Model ready: FCN/{} with {} classes, {} train samples",
        cfg.backbone, classes.len(), train_ds.sample_count()
    );
    tracing::debug!("{}", model);

    // ── SGD + poly schedule ───────────────────────────────────────────────────
    // v = momentum * v + g + wd * θ
    // θ = θ - lr(t) * v
    let optim_cfg = SgdConfig::new()
        .with_momentum(Some(
            MomentumConfig::new()
                .with_momentum(cfg.momentum)
                .with_dampening(0.0),
        ))
        .with_weight_decay(Some(WeightDecayConfig::new(cfg.weight_decay as f32)));
    let mut optim = optim_cfg.init();

    let num_samples     = train_ds.sample_count();
    let iters_per_epoch = num_samples.div_ceil(cfg.batch_size);
    let mut schedule    = PolyLr::new(cfg.lr, cfg.epochs, iters_per_epoch).starting_at(start, iters_per_epoch);
    let criterion       = SegLoss::new(cfg.aux_weight);

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(SegBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(train_ds);

    // ── Validation data loader (InnerBackend, no autodiff overhead) ──────────
    let val_loader = val_ds.map(|ds| {
        DataLoaderBuilder::new(SegBatcher::<B::InnerBackend>::new(device.clone()))
            .batch_size(cfg.batch_size)
            .num_workers(cfg.num_workers)
            .build(ds)
    });

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut last_checkpoint = None;

    for epoch in start..cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut seen     = 0usize;
        let mut lr       = schedule.lr();

        for (i, batch) in train_loader.iter().enumerate() {
            seen += batch.images.dims()[0];

            let output = model.forward(batch.images);
            let loss   = criterion.forward(output, batch.targets);

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches  += 1;
            tracing::info!("Epoch {}, batch {}, training loss {:.3}", epoch, i, loss_sum / (i + 1) as f64);

            lr = schedule.step();
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);
        }

        // A sample that fails to decode ends the stream early.
        if seen < num_samples {
            bail!(
                "Epoch {} saw only {} of {} training samples; see the errors logged above",
                epoch, seen, num_samples
            );
        }

        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        let mut row = EpochMetrics::new(epoch, train_loss, lr);

        // ── Validation phase ──────────────────────────────────────────────────
        if let Some(loader) = &val_loader {
            let (pix_acc, miou) = evaluate(&model.valid(), loader.iter(), classes.len())?;
            tracing::info!("Epoch {} validation: pixAcc={:.4}, mIoU={:.4}", epoch, pix_acc, miou);
            row = row.with_validation(pix_acc, miou);
        }
        metrics.log(&row)?;

        if should_save(epoch, cfg.epochs, cfg.save_every) {
            let path = ckpt_manager.save(epoch, &model.snapshot()?)?;
            tracing::info!("Checkpoint saved to {}", path.display());
            last_checkpoint = Some(path);
        }
    }

    tracing::info!("Training complete!");
    Ok(TrainSummary {
        start_epoch: start,
        epochs_run:  cfg.epochs - start,
        last_checkpoint,
    })
}
