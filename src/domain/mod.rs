// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits describing what a network
// and a training run ARE. No Burn types, no file I/O.

// Closed set of layer kinds and their typed parameters
pub mod layer;

// Ordered layers + shape inference + summary
pub mod architecture;

// Optimiser / loss / dataset choices and the Program pairing
pub mod plan;

// Raw labelled images and dataset splits
pub mod digit;

// Abstractions implemented by the data layer
pub mod traits;
