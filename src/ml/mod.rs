// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network, loss and optimisation code lives here.
// Other layers only see FcnModel through the ParameterSnapshot
// trait and run_training's plain-Rust signature.
//
// What's in this layer:
//
//   backbone.rs  Dilated ResNet (18/34/50/101/152)
//                • basic or bottleneck residual blocks
//                • stages 3 and 4 dilated, output stride 8
//
//   model.rs     FCN: backbone + main head (stage 4)
//                + auxiliary head (stage 3), bilinear
//                upsampling back to the input size
//
//   loss.rs      cross-entropy over non-ignored pixels,
//                main + weighted auxiliary
//
//   scheduler.rs poly learning-rate decay
//
//   evaluator.rs confusion matrix, pixel accuracy, mIoU
//
//   trainer.rs   resumable training loop with periodic
//                checkpoints and optional validation
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Long et al. (2015) Fully Convolutional Networks
//            He et al. (2016) Deep Residual Learning

/// Dilated ResNet feature extractor
pub mod backbone;

/// FCN segmentation model and parameter snapshots
pub mod model;

/// Masked and composite cross-entropy
pub mod loss;

/// Poly learning-rate schedule
pub mod scheduler;

/// Validation metrics
pub mod evaluator;

/// Full training loop with resume and checkpointing
pub mod trainer;
