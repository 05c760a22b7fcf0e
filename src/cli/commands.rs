// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// Every training hyperparameter as a command-line flag.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for bad values
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::Args;

use crate::application::train_use_case::TrainConfig;
use crate::ml::backbone::BackboneKind;

/// All arguments for a training run.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Newline-delimited class list; line order is the label index
    #[arg(short = 'c', long = "classes", default_value = "./")]
    pub classes: String,

    /// VOC-style dataset root (or a VOCdevkit containing VOC2012)
    #[arg(short = 'p', long = "path_dataset", default_value = "./")]
    pub path_dataset: String,

    /// Images per optimiser step
    #[arg(short = 'b', long = "batch", default_value_t = 12,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub batch: u64,

    /// Base learning rate of the poly schedule (also -lr)
    #[arg(long = "l_rate", default_value_t = 0.001)]
    pub l_rate: f64,

    /// SGD weight decay
    #[arg(short = 'w', long = "w_decay", default_value_t = 0.0001)]
    pub w_decay: f64,

    /// Number of epochs, numbered 0..epochs-1
    #[arg(short = 'e', long = "epochs", default_value_t = 50)]
    pub epochs: usize,

    /// Directory for epoch_NNNN.params, train_config.json and metrics.csv (also -ch)
    #[arg(long = "checkpoint", default_value = "./")]
    pub checkpoint: String,

    /// ResNet depth used as the FCN backbone
    #[arg(long, default_value = "resnet101")]
    pub backbone: BackboneKind,

    /// Channel width of the ResNet stem; later stages scale from it
    #[arg(long = "base-width", default_value_t = 64,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub base_width: u64,

    /// Height every image and mask is resized to
    #[arg(long, default_value_t = 256)]
    pub height: u32,

    /// Width every image and mask is resized to
    #[arg(long, default_value_t = 256)]
    pub width: u32,

    /// Weight of the auxiliary head's loss
    #[arg(long = "aux-weight", default_value_t = 0.2)]
    pub aux_weight: f64,

    /// SGD momentum
    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// Save a checkpoint every N epochs (the last epoch is always saved)
    #[arg(long = "save-every", default_value_t = 10)]
    pub save_every: usize,

    /// Data loading worker threads
    #[arg(long = "num-workers", default_value_t = 4)]
    pub num_workers: usize,

    /// Shuffle seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Evaluate pixel accuracy and mIoU on the val split after each epoch
    #[arg(long)]
    pub validate: bool,

    /// Burn record file with backbone parameters, used on a cold start
    #[arg(long = "pretrained-backbone")]
    pub pretrained_backbone: Option<String>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            classes:             a.classes,
            dataset_root:        a.path_dataset,
            checkpoint_dir:      a.checkpoint,
            batch_size:          a.batch as usize,
            lr:                  a.l_rate,
            weight_decay:        a.w_decay,
            momentum:            a.momentum,
            epochs:              a.epochs,
            save_every:          a.save_every,
            backbone:            a.backbone,
            base_width:          a.base_width as usize,
            height:              a.height,
            width:               a.width,
            aux_weight:          a.aux_weight,
            num_workers:         a.num_workers,
            seed:                a.seed,
            validate:            a.validate,
            pretrained_backbone: a.pretrained_backbone,
        }
    }
}
