// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe what a training run works with.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
//   class_registry.rs  ordered class names, label index mapping
//   checkpoint_name.rs the `epoch_NNNN.params` naming convention
//   traits.rs          seams the other layers implement
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Ordered list of segmentation classes
pub mod class_registry;

// Checkpoint filename formatting and strict parsing
pub mod checkpoint_name;

// Core abstractions (traits) that other layers implement
pub mod traits;
