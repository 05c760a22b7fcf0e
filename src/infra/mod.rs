// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by the training workflow:
//
//   checkpoint.rs Discovering and writing parameter snapshots
//                 (epoch_NNNN.params) and the run's config JSON.
//
//   metrics.rs    Training metrics logging
//                 Appends epoch-level metrics (loss, pixel
//                 accuracy, mIoU, learning rate) to a CSV file.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow / thiserror)

/// Checkpoint discovery, atomic saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
