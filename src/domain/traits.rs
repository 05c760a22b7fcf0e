// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training workflow talks to the model and to the data
// source through these traits, never through concrete types.
//
//   ParameterSnapshot → implemented by FcnModel (Layer 5)
//   SampleSource      → implemented by VocSegmentation (Layer 4)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

// ─── ParameterSnapshot ────────────────────────────────────────────────────────
/// Anything whose trainable parameters can be captured as an
/// opaque byte blob and restored from one.
///
/// The checkpoint manager stores these blobs without looking
/// inside them.
pub trait ParameterSnapshot: Sized {
    /// Where restored parameters are placed (e.g. a GPU device)
    type Device;

    /// Serialise all trainable parameters
    fn snapshot(&self) -> Result<Vec<u8>>;

    /// Replace this instance's parameters with the ones in `bytes`.
    /// Fails if the blob was produced by a different architecture.
    fn restore(self, bytes: &[u8], device: &Self::Device) -> Result<Self>;
}

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// An indexed collection of training examples on disk.
pub trait SampleSource {
    /// Number of examples in the split
    fn sample_count(&self) -> usize;

    /// Number of label classes the masks are decoded against
    fn num_classes(&self) -> usize;
}
